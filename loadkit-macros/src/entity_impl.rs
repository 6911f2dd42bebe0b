use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    ext::IdentExt, parse_macro_input, Attribute, Data, DeriveInput, Expr, ExprLit, Field, Lit, LitStr, Meta,
    MetaNameValue,
};

pub(crate) fn derive_entity_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(e) => TokenStream::from(e.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let entity_name = name.unraw().to_string();

    // inventory 只能登记具体类型
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic types",
        ));
    }

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(name, "Entity can only be derived for structs"));
    };

    let mut id_fields = data
        .fields
        .iter()
        .filter_map(|field| id_attribute(field).map(|attr| (field, attr)));

    let first = id_fields.next();
    if let Some((extra, _)) = id_fields.next() {
        return Err(syn::Error::new_spanned(extra, "Only one field may be marked with #[id]"));
    }

    let metadata = match first {
        Some((field, attr)) => {
            let property = id_property(attr, field)?;
            let id_ty = &field.ty;
            quote! {
                ::loadkit_web::metadata::StaticEntityMetadata::new(
                    #entity_name,
                    #property,
                    <#id_ty as ::loadkit_web::metadata::Identifier>::ID_TYPE,
                )
            }
        }
        None => quote! {
            ::loadkit_web::metadata::StaticEntityMetadata::without_identifier(#entity_name)
        },
    };

    Ok(quote! {
        impl ::loadkit_web::metadata::Entity for #name {
            fn metadata() -> ::loadkit_web::metadata::StaticEntityMetadata {
                #metadata
            }
        }

        // 向 inventory 注册实体元数据
        ::loadkit_web::inventory::submit! {
            ::loadkit_web::metadata::EntityRegistration::new(
                ::loadkit_web::metadata::EntityType::of::<#name>,
                <#name as ::loadkit_web::metadata::Entity>::metadata,
            )
        }
    })
}

fn id_attribute(field: &Field) -> Option<&Attribute> {
    field.attrs.iter().find(|attr| attr.path().is_ident("id"))
}

/// `#[id]`、`#[id("name")]` 或 `#[id(name = "name")]`
fn id_property(attr: &Attribute, field: &Field) -> syn::Result<String> {
    match &attr.meta {
        Meta::Path(_) => field
            .ident
            .as_ref()
            .map(|ident| ident.unraw().to_string())
            .ok_or_else(|| syn::Error::new_spanned(attr, "Tuple fields need an explicit name: #[id(\"name\")]")),
        Meta::List(list) => {
            if let Ok(lit) = list.parse_args::<LitStr>() {
                return Ok(lit.value());
            }

            let pair: MetaNameValue = list.parse_args()?;
            if !pair.path.is_ident("name") {
                return Err(syn::Error::new_spanned(&pair.path, "Expected `name = \"...\"`"));
            }
            match &pair.value {
                Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) => Ok(s.value()),
                other => Err(syn::Error::new_spanned(other, "Expected a string literal")),
            }
        }
        Meta::NameValue(pair) => Err(syn::Error::new_spanned(pair, "Use #[id] or #[id(\"name\")]")),
    }
}
