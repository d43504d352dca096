use proc_macro::TokenStream;
use quote::quote;
use syn::{DataEnum, DeriveInput, Fields, LitStr, Result};

pub(crate) fn generate_doc_enum(ast: &DeriveInput, data: &DataEnum) -> Result<TokenStream> {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let mut idents = Vec::with_capacity(data.variants.len());
    let mut stored_names = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "only fieldless variants can be stored by name",
            ));
        }

        let mut stored_name = variant.ident.to_string();
        for attr in &variant.attrs {
            if attr.path().is_ident("doc_enum") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("name") {
                        let s: LitStr = meta.value()?.parse()?;
                        stored_name = s.value();
                        Ok(())
                    } else {
                        Err(meta.error("Unknown doc_enum attribute"))
                    }
                })?;
            }
        }
        if stored_names.contains(&stored_name) {
            return Err(syn::Error::new_spanned(
                variant,
                format!("duplicate stored name '{}'", stored_name),
            ));
        }
        idents.push(&variant.ident);
        stored_names.push(stored_name);
    }

    let gen = quote! {
        impl #impl_generics docmap::convert::DocEnum for #name #ty_generics #where_clause {
            fn variant_name(&self) -> &'static str {
                match self {
                    #(#name::#idents => #stored_names,)*
                }
            }

            fn from_variant_name(name: &str) -> Option<Self> {
                match name {
                    #(#stored_names => Some(#name::#idents),)*
                    _ => None,
                }
            }
        }

        impl #impl_generics docmap::convert::FieldType for #name #ty_generics #where_clause {
            fn descriptor() -> docmap::schema::TypeDescriptor {
                docmap::schema::TypeDescriptor::enumeration::<Self>()
            }

            fn to_value(
                &self,
                _mapper: &docmap::mapper::Mapper,
            ) -> docmap::errors::MapperResult<docmap::document::Value> {
                Ok(docmap::convert::enum_to_value(self))
            }

            fn from_value(
                _mapper: &docmap::mapper::Mapper,
                value: docmap::document::Value,
            ) -> docmap::errors::MapperResult<Self> {
                docmap::convert::enum_from_value(&value)
            }
        }
    };

    Ok(TokenStream::from(gen))
}
