use unsynn::*;

unsynn! {
    struct Signature {
        items: Any<Cons<Except<BraceGroup>, TokenTree>>,
    }

    struct TestFn {
        signature: Signature,
        body: BraceGroup,
    }
}

impl quote::ToTokens for Signature {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        self.items.to_tokens(tokens)
    }
}

/// Test attribute that installs the tessel test subscriber before the body
/// runs.
///
/// ```ignore
/// use tessel_testhelpers::test;
///
/// #[test]
/// fn decodes() {
///     // TESSEL_LOG filters the tracing output
/// }
/// ```
///
/// Another test attribute can be named as the argument, for example
/// `#[tessel_testhelpers::test(tokio::test)]`.
#[proc_macro_attribute]
pub fn test(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let item = TokenStream::from(item);
    let TestFn { signature, body } = item
        .to_token_iter()
        .parse::<TestFn>()
        .unwrap_or_else(|err| panic!("#[test] must be placed on a function: {err:?}"));

    let test_attr = if attr.is_empty() {
        quote::quote! { #[::core::prelude::rust_2024::test] }
    } else {
        let attr = TokenStream::from(attr);
        quote::quote! { #[#attr] }
    };
    let body = body.0.stream();

    quote::quote! {
        #test_attr
        #signature {
            ::tessel_testhelpers::setup();
            #body
        }
    }
    .into()
}
