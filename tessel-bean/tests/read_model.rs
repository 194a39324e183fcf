use rust_decimal::Decimal;
use tessel_bean::{BeanDescriptor, DefaultRegistry, PropertyDescriptor, Registry, SerdeConfig, TypeKey};
use tessel_core::{DeserializeErrorKind, IntrospectionError, Value};
use tessel_testhelpers::test;

mod common;
use common::read;

#[derive(Debug, Default, PartialEq)]
struct Article {
    title: String,
    subtitle: Option<String>,
    views: i32,
    ratings: Vec<i32>,
}

fn article(config: SerdeConfig) -> DefaultRegistry {
    let registry = DefaultRegistry::new(config);
    registry.register_list::<i32>();
    registry.register_bean(
        BeanDescriptor::of::<Article>()
            .property(
                PropertyDescriptor::field("title", |a: &Article| &a.title)
                    .with_setter(|a: &mut Article, v: String| a.title = v)
                    .aliases(["heading", "name"]),
            )
            .property(
                PropertyDescriptor::nullable("subtitle", |a: &Article| a.subtitle.as_ref())
                    .with_nullable_setter(|a: &mut Article, v: Option<String>| a.subtitle = v),
            )
            .property(
                PropertyDescriptor::field("views", |a: &Article| &a.views)
                    .with_setter(|a: &mut Article, v: i32| a.views = v),
            )
            .property(
                PropertyDescriptor::field("ratings", |a: &Article| &a.ratings)
                    .with_setter(|a: &mut Article, v: Vec<i32>| a.ratings = v),
            ),
    );
    registry
}

#[test]
fn decodes_declared_properties() {
    let registry = article(SerdeConfig::default());
    let decoded = read::<Article>(
        &registry,
        r#"{"title":"Tessel","subtitle":"A guide","views":12,"ratings":[5,4]}"#,
    )
    .unwrap();
    assert_eq!(
        decoded,
        Article {
            title: "Tessel".into(),
            subtitle: Some("A guide".into()),
            views: 12,
            ratings: vec![5, 4],
        }
    );
}

#[test]
fn unknown_properties_follow_the_policy() {
    let json = r#"{"title":"t","extra":{"deep":[1,2,{"x":null}]},"views":1}"#;

    let lenient = article(SerdeConfig::default());
    let decoded = read::<Article>(&lenient, json).unwrap();
    assert_eq!((decoded.title.as_str(), decoded.views), ("t", 1));

    let strict = article(SerdeConfig::default().ignore_unknown(false));
    let err = read::<Article>(&strict, json).unwrap_err();
    assert!(matches!(
        err.kind,
        DeserializeErrorKind::UnknownProperty { ref property, .. } if property == "extra"
    ));
    assert_eq!(err.path.as_deref(), Some("$.extra"));
}

#[test]
fn bean_policy_overrides_configuration() {
    let registry = DefaultRegistry::new(SerdeConfig::default().ignore_unknown(false));
    registry.register_bean(
        BeanDescriptor::of::<Article>()
            .ignore_unknown(true)
            .property(
                PropertyDescriptor::field("views", |a: &Article| &a.views)
                    .with_setter(|a: &mut Article, v: i32| a.views = v),
            ),
    );
    assert_eq!(read::<Article>(&registry, r#"{"who":"knows","views":2}"#).unwrap().views, 2);
}

#[test]
fn aliases_and_case_insensitive_keys() {
    let registry = article(SerdeConfig::default());
    assert_eq!(read::<Article>(&registry, r#"{"heading":"a"}"#).unwrap().title, "a");
    assert_eq!(read::<Article>(&registry, r#"{"name":"b"}"#).unwrap().title, "b");
    assert_eq!(read::<Article>(&registry, r#"{"TITLE":"c"}"#).unwrap().title, "");

    let registry = article(SerdeConfig::default().case_insensitive_properties(true));
    assert_eq!(read::<Article>(&registry, r#"{"TITLE":"c"}"#).unwrap().title, "c");
    assert_eq!(read::<Article>(&registry, r#"{"Heading":"d"}"#).unwrap().title, "d");
}

#[test]
fn required_properties_must_be_present() {
    let registry = DefaultRegistry::default();
    registry.register_bean(
        BeanDescriptor::of::<Article>()
            .property(
                PropertyDescriptor::field("title", |a: &Article| &a.title)
                    .with_setter(|a: &mut Article, v: String| a.title = v)
                    .required(),
            )
            .property(
                PropertyDescriptor::field("views", |a: &Article| &a.views)
                    .with_setter(|a: &mut Article, v: i32| a.views = v),
            ),
    );
    let err = read::<Article>(&registry, r#"{"views":3}"#).unwrap_err();
    assert!(matches!(
        err.kind,
        DeserializeErrorKind::MissingProperty { ref property, .. } if property == "title"
    ));
    assert!(read::<Article>(&registry, r#"{"title":"","views":3}"#).is_ok());
}

#[test]
fn nulls() {
    let registry = article(SerdeConfig::default());

    let decoded = read::<Article>(&registry, r#"{"subtitle":null}"#).unwrap();
    assert_eq!(decoded.subtitle, None);

    let err = read::<Article>(&registry, r#"{"views":null}"#).unwrap_err();
    assert!(matches!(err.kind, DeserializeErrorKind::UnexpectedNull { .. }));
    assert_eq!(err.path.as_deref(), Some("$.views"));

    // a wrapped null is not a null
    let err = read::<Article>(&registry, r#"{"views":[null]}"#).unwrap_err();
    assert!(matches!(err.kind, DeserializeErrorKind::UnexpectedToken { .. }));

    let err = read::<Article>(&registry, r#"{"ratings":[1,null]}"#).unwrap_err();
    assert!(matches!(err.kind, DeserializeErrorKind::UnexpectedNull { .. }));
}

#[test]
fn scalar_coercions() {
    let registry = article(SerdeConfig::default());
    let views = |json: &str| read::<Article>(&registry, json).map(|a| a.views);

    assert_eq!(views(r#"{"views":"42"}"#).unwrap(), 42);
    assert_eq!(views(r#"{"views":true}"#).unwrap(), 1);
    assert_eq!(views(r#"{"views":[42]}"#).unwrap(), 42);

    let err = views(r#"{"views":"abc"}"#).unwrap_err();
    assert!(matches!(err.kind, DeserializeErrorKind::Coercion { target: "integer" }));
    assert_eq!(err.invalid_value.as_deref(), Some("abc"));

    let err = views(r#"{"views":[5,6]}"#).unwrap_err();
    assert!(matches!(err.kind, DeserializeErrorKind::MultipleValues { .. }));
    assert!(views(r#"{"views":[[5]]}"#).is_err());

    // numbers and booleans render into strings
    let title = read::<Article>(&registry, r#"{"title":12.5}"#).unwrap().title;
    assert_eq!(title, "12.5");
}

#[derive(Debug, Default, PartialEq)]
struct Ledger {
    amount: Decimal,
}

#[test]
fn big_numbers_fall_back_to_zero() {
    let registry = DefaultRegistry::default();
    registry.register_bean(
        BeanDescriptor::of::<Ledger>().property(
            PropertyDescriptor::field("amount", |l: &Ledger| &l.amount)
                .with_setter(|l: &mut Ledger, v: Decimal| l.amount = v),
        ),
    );
    assert_eq!(
        read::<Ledger>(&registry, r#"{"amount":"abc"}"#).unwrap().amount,
        Decimal::ZERO
    );
    assert_eq!(
        read::<Ledger>(&registry, r#"{"amount":"12.50"}"#).unwrap().amount,
        Decimal::new(1250, 2)
    );
}

#[derive(Debug, Default, PartialEq)]
struct Grid {
    cells: Vec<Vec<i32>>,
    meta: Value,
}

#[test]
fn nesting_depth_boundary() {
    let registry = DefaultRegistry::new(SerdeConfig::default().maximum_nesting_depth(3));
    registry.register_list::<i32>();
    registry.register_list::<Vec<i32>>();
    registry.register_bean(
        BeanDescriptor::of::<Grid>()
            .property(
                PropertyDescriptor::field("cells", |g: &Grid| &g.cells)
                    .with_setter(|g: &mut Grid, v: Vec<Vec<i32>>| g.cells = v),
            )
            .property(
                PropertyDescriptor::field("meta", |g: &Grid| &g.meta)
                    .with_setter(|g: &mut Grid, v: Value| g.meta = v),
            ),
    );
    // object, outer array, inner array: exactly three levels
    let grid = read::<Grid>(&registry, r#"{"cells":[[1],[2,3]],"meta":[[0]]}"#).unwrap();
    assert_eq!(grid.cells, vec![vec![1], vec![2, 3]]);
    assert_eq!(grid.meta.to_string(), "[[0]]");

    let err = read::<Grid>(&registry, r#"{"meta":[[[0]]]}"#).unwrap_err();
    assert!(matches!(err.kind, DeserializeErrorKind::DepthExceeded { limit: 3 }));
}

#[derive(Debug, Default, PartialEq)]
struct Audit {
    id: i32,
    created: String,
}

#[test]
fn read_only_properties_are_skipped_on_input() {
    let registry = DefaultRegistry::new(SerdeConfig::default().ignore_unknown(false));
    registry.register_bean(
        BeanDescriptor::of::<Audit>()
            .property(
                PropertyDescriptor::field("id", |a: &Audit| &a.id)
                    .with_setter(|a: &mut Audit, v: i32| a.id = v),
            )
            .property(
                PropertyDescriptor::field("created", |a: &Audit| &a.created)
                    .with_setter(|a: &mut Audit, v: String| a.created = v)
                    .read_only(),
            ),
    );
    let audit = read::<Audit>(&registry, r#"{"id":1,"created":"yesterday"}"#).unwrap();
    assert_eq!(audit, Audit { id: 1, created: String::new() });

    let model = registry.deser_bean(TypeKey::of::<Audit>()).unwrap();
    assert!(model.is_skipped("created"));
    assert_eq!(model.properties().len(), 1);
}

struct NoDefault {
    id: i32,
}

#[test]
fn beans_without_an_instantiator_cannot_be_read() {
    let registry = DefaultRegistry::default();
    registry.register_bean(
        BeanDescriptor::new::<NoDefault>().property(PropertyDescriptor::field("id", |n: &NoDefault| &n.id)),
    );
    let err = read::<NoDefault>(&registry, r#"{"id":1}"#).err().map(|e| e.kind);
    assert!(matches!(
        err,
        Some(DeserializeErrorKind::Introspection(IntrospectionError::NoInstantiator { .. }))
    ));
}
