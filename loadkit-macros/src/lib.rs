mod entity_impl;

use proc_macro::TokenStream;

/// Entity 派生宏
///
/// 用法：
/// ```ignore
/// #[derive(Entity)]
/// struct Item {
///     #[id]                  // 主键属性名默认取字段名
///     id: i64,
/// }
///
/// #[derive(Entity)]
/// struct Account {
///     #[id("accountNumber")] // 自定义主键属性名
///     // 或
///     #[id(name = "accountNumber")]
///     number: String,
/// }
/// ```
///
/// 没有 `#[id]` 字段的实体仍会注册，但不能用于加载
#[proc_macro_derive(Entity, attributes(id))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity_impl::derive_entity_impl(input)
}
