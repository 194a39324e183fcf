use core::any::Any;
use std::sync::Arc;
use std::thread;

use indexmap::IndexMap;
use tessel::{
    BeanDescriptor, Decimal, DeserializeErrorKind, Include, NamingStrategy, PropertyDescriptor,
    SerdeConfig, Subtypes, Tessel, Value,
};
use tessel_testhelpers::{test, tokens};

#[derive(Debug, Default, Clone, PartialEq)]
struct Customer {
    display_name: String,
    email: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct LineItem {
    sku: String,
    quantity: u32,
    unit_price: Decimal,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Card {
    last_four: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Invoice {
    due_days: u32,
}

#[derive(Debug, Clone, PartialEq)]
enum Payment {
    Card(Card),
    Invoice(Invoice),
}

fn concrete(payment: &Payment) -> &dyn Any {
    match payment {
        Payment::Card(card) => card,
        Payment::Invoice(invoice) => invoice,
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Order {
    order_id: u64,
    customer: Customer,
    items: Vec<LineItem>,
    attributes: IndexMap<String, String>,
    payment: Option<Payment>,
}

fn shop(config: SerdeConfig) -> Tessel {
    let tessel = Tessel::new(config);
    let registry = tessel.registry();
    registry
        .register_option::<String>()
        .register_option::<Payment>()
        .register_list::<LineItem>()
        .register_map::<String>();
    registry.register_bean(
        BeanDescriptor::of::<Customer>()
            .property(
                PropertyDescriptor::field("displayName", |c: &Customer| &c.display_name)
                    .with_setter(|c: &mut Customer, v: String| c.display_name = v),
            )
            .property(
                PropertyDescriptor::nullable("email", |c: &Customer| c.email.as_ref())
                    .with_nullable_setter(|c: &mut Customer, v: Option<String>| c.email = v),
            ),
    );
    registry.register_bean(
        BeanDescriptor::of::<LineItem>()
            .property(
                PropertyDescriptor::field("sku", |i: &LineItem| &i.sku)
                    .with_setter(|i: &mut LineItem, v: String| i.sku = v)
                    .required(),
            )
            .property(
                PropertyDescriptor::field("quantity", |i: &LineItem| &i.quantity)
                    .with_setter(|i: &mut LineItem, v: u32| i.quantity = v),
            )
            .property(
                PropertyDescriptor::field("unitPrice", |i: &LineItem| &i.unit_price)
                    .with_setter(|i: &mut LineItem, v: Decimal| i.unit_price = v),
            ),
    );
    registry.register_bean(
        BeanDescriptor::of::<Card>().property(
            PropertyDescriptor::field("lastFour", |c: &Card| &c.last_four)
                .with_setter(|c: &mut Card, v: String| c.last_four = v),
        ),
    );
    registry.register_bean(
        BeanDescriptor::of::<Invoice>().property(
            PropertyDescriptor::field("dueDays", |i: &Invoice| &i.due_days)
                .with_setter(|i: &mut Invoice, v: u32| i.due_days = v),
        ),
    );
    registry.register_subtypes(
        Subtypes::new(concrete)
            .property("method")
            .named_subtype(&["card"], Payment::Card)
            .named_subtype(&["invoice"], Payment::Invoice),
    );
    registry.register_bean(
        BeanDescriptor::of::<Order>()
            .property(
                PropertyDescriptor::field("orderId", |o: &Order| &o.order_id)
                    .with_setter(|o: &mut Order, v: u64| o.order_id = v),
            )
            .property(
                PropertyDescriptor::field("customer", |o: &Order| &o.customer)
                    .with_setter(|o: &mut Order, v: Customer| o.customer = v),
            )
            .property(
                PropertyDescriptor::field("items", |o: &Order| &o.items)
                    .with_setter(|o: &mut Order, v: Vec<LineItem>| o.items = v),
            )
            .property(
                PropertyDescriptor::field("attributes", |o: &Order| &o.attributes)
                    .with_setter(|o: &mut Order, v: IndexMap<String, String>| o.attributes = v),
            )
            .property(
                PropertyDescriptor::nullable("payment", |o: &Order| o.payment.as_ref())
                    .with_nullable_setter(|o: &mut Order, v: Option<Payment>| o.payment = v),
            ),
    );
    tessel
}

fn order() -> Order {
    Order {
        order_id: 1001,
        customer: Customer {
            display_name: "Ada".into(),
            email: None,
        },
        items: vec![
            LineItem {
                sku: "pen".into(),
                quantity: 3,
                unit_price: Decimal::new(150, 2),
            },
            LineItem {
                sku: "ink".into(),
                quantity: 1,
                unit_price: Decimal::new(899, 2),
            },
        ],
        attributes: IndexMap::from([("gift".to_owned(), "yes".to_owned())]),
        payment: Some(Payment::Invoice(Invoice { due_days: 30 })),
    }
}

#[test]
fn orders_round_trip_through_values() {
    let tessel = shop(SerdeConfig::default());
    let order = order();
    let value = tessel.to_value(&order).unwrap();

    assert_eq!(value.get("orderId").map(Value::to_string).as_deref(), Some("1001"));
    assert_eq!(
        value.get("payment").and_then(|p| p.get("method")),
        Some(&Value::from("invoice"))
    );
    // empty and null properties are left out by default
    assert_eq!(value.get("customer").and_then(|c| c.get("email")), None);

    assert_eq!(tessel.from_value::<Order>(value).unwrap(), order);
}

#[test]
fn naming_and_inclusion_come_from_the_configuration() {
    let tessel = shop(
        SerdeConfig::default()
            .naming_strategy(NamingStrategy::SnakeCase)
            .inclusion(Include::Always),
    );
    let value = tessel.to_value(&Customer::default()).unwrap();
    assert_eq!(value.to_string(), r#"{"display_name":"","email":null}"#);
}

#[test]
fn orders_decode_from_loose_input() {
    let tessel = shop(SerdeConfig::default());
    let json = r#"{
        "orderId": "1001",
        "customer": {"displayName": "Ada", "loyalty": {"tier": "gold"}},
        "items": [
            {"sku": "pen", "quantity": [3], "unitPrice": "1.50"},
            {"sku": "ink", "quantity": true, "unitPrice": 8.99}
        ],
        "payment": {"method": "card", "lastFour": 4242}
    }"#;
    let decoded = tessel.from_tokens::<Order>(tokens(json)).unwrap();
    assert_eq!(decoded.order_id, 1001);
    assert_eq!(decoded.customer.display_name, "Ada");
    assert_eq!(decoded.items[0].quantity, 3);
    assert_eq!(decoded.items[0].unit_price, Decimal::new(150, 2));
    assert_eq!(decoded.items[1].quantity, 1);
    assert_eq!(
        decoded.payment,
        Some(Payment::Card(Card {
            last_four: "4242".into()
        }))
    );
}

#[test]
fn errors_point_at_the_offending_value() {
    let tessel = shop(SerdeConfig::default());

    let err = tessel
        .from_tokens::<Order>(tokens(r#"{"items":[{"sku":"a"},{"quantity":2}]}"#))
        .unwrap_err();
    assert!(matches!(
        err.kind,
        DeserializeErrorKind::MissingProperty { ref property, .. } if property == "sku"
    ));
    assert!(err.path.as_deref().is_some_and(|path| path.starts_with("$.items[1]")));

    let err = tessel
        .from_tokens::<Order>(tokens(r#"{"items":[{"sku":"a","quantity":"many"}]}"#))
        .unwrap_err();
    assert!(matches!(err.kind, DeserializeErrorKind::Coercion { .. }));
    assert_eq!(err.path.as_deref(), Some("$.items[0].quantity"));
    assert_eq!(err.invalid_value.as_deref(), Some("many"));
}

#[test]
fn nesting_limits_apply_to_both_directions() {
    let tessel = shop(SerdeConfig::default().maximum_nesting_depth(2));
    let err = tessel
        .from_tokens::<Order>(tokens(r#"{"items":[{"sku":"a"}]}"#))
        .unwrap_err();
    assert_eq!(err.kind, DeserializeErrorKind::DepthExceeded { limit: 2 });
    assert!(tessel.to_value(&order()).is_err());
    assert!(tessel.to_value(&Customer::default()).is_ok());
}

#[test]
fn a_shared_instance_serves_many_threads() {
    let tessel = Arc::new(shop(SerdeConfig::default()));
    let handles: Vec<_> = (0..8u64)
        .map(|n| {
            let tessel = tessel.clone();
            thread::spawn(move || {
                let mut order = order();
                order.order_id = n;
                let value = tessel.to_value(&order).unwrap();
                tessel.from_value::<Order>(value).unwrap()
            })
        })
        .collect();
    for (n, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap().order_id, n as u64);
    }
}
