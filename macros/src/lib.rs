//! Procedural macros for nskv


use proc_macro::TokenStream;

/// Attribute macro for test functions that need a backend
///
/// Creates a fresh in-memory backend, passes it to the test as
/// `Arc<dyn Backend>`, and closes it once the test body returns.
///
/// # Basic usage
///
/// ```ignore
/// #[nskv_macros::backend_test]
/// async fn my_test(backend: Arc<dyn Backend>) {
///     // test body
/// }
/// ```
///
/// # With a custom backend
///
/// ```ignore
/// #[nskv_macros::backend_test(backend = FileBackend::open(path).await.unwrap())]
/// async fn my_test(backend: Arc<dyn Backend>) {
///     // test body
/// }
/// ```
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    test::backend::test_impl(args.into(), input.into()).into()
}
