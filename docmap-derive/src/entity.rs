use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{DataStruct, DeriveInput, Field, Fields, LitStr, Result};

#[derive(Default)]
struct IndexAttr {
    fields: Vec<String>,
    name: Option<String>,
    unique: bool,
    sparse: bool,
}

#[derive(Default)]
struct TextIndexAttr {
    fields: Vec<String>,
    name: Option<String>,
    language: Option<String>,
}

#[derive(Default)]
struct IndexedAttr {
    name: Option<String>,
    descending: bool,
    unique: bool,
    sparse: bool,
}

#[derive(Default)]
struct PropertyAttr {
    name: Option<String>,
    id: bool,
    overflow: bool,
    transient: bool,
    base: bool,
    indexed: Option<IndexedAttr>,
}

pub(crate) fn generate_entity_for_struct(ast: &DeriveInput, data: &DataStruct) -> Result<TokenStream> {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let mut entity_name: Option<String> = None;
    let mut embedded = false;
    let mut indexes: Vec<IndexAttr> = Vec::new();
    let mut text_indexes: Vec<TextIndexAttr> = Vec::new();

    for attr in &ast.attrs {
        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let s: LitStr = meta.value()?.parse()?;
                    entity_name = Some(s.value());
                    Ok(())
                } else if meta.path.is_ident("embedded") {
                    embedded = true;
                    Ok(())
                } else if meta.path.is_ident("index") {
                    indexes.push(parse_index(&meta)?);
                    Ok(())
                } else if meta.path.is_ident("text_index") {
                    text_indexes.push(parse_text_index(&meta)?);
                    Ok(())
                } else {
                    Err(meta.error("Unknown entity attribute"))
                }
            })?;
        }
    }

    let fields: Vec<&Field> = match &data.fields {
        Fields::Named(fields) => fields.named.iter().collect(),
        _ => {
            return Err(syn::Error::new_spanned(
                ast,
                "only structs with named fields are supported",
            ))
        }
    };

    let mut field_calls: Vec<TokenStream2> = Vec::with_capacity(fields.len());
    for field in fields {
        let property = parse_property(field)?;
        if property.transient {
            continue;
        }
        let ident = match &field.ident {
            Some(ident) => ident,
            None => continue,
        };

        if property.base {
            field_calls.push(quote! {
                builder.base(|record| &record.#ident, |record| &mut record.#ident);
            });
            continue;
        }

        let field_name = ident.to_string();
        let mut decl = quote! { docmap::schema::FieldDecl::new(#field_name) };
        if let Some(storage_name) = &property.name {
            decl = quote! { #decl.name(#storage_name) };
        }
        if property.id {
            decl = quote! { #decl.id() };
        }
        if property.overflow {
            decl = quote! { #decl.overflow() };
        }
        if let Some(indexed) = &property.indexed {
            let indexed = indexed_tokens(indexed);
            decl = quote! { #decl.indexed(#indexed) };
        }
        field_calls.push(quote! {
            builder.field(#decl, |record| &record.#ident, |record| &mut record.#ident);
        });
    }

    let name_call = entity_name.map(|entity_name| quote! { builder.name(#entity_name); });
    let index_calls = indexes.iter().map(index_tokens);
    let text_index_calls = text_indexes.iter().map(text_index_tokens);
    let kind_fn = if embedded {
        Some(quote! {
            fn entity_kind() -> docmap::schema::EntityKind {
                docmap::schema::EntityKind::Embedded
            }
        })
    } else {
        None
    };

    let gen = quote! {
        impl #impl_generics docmap::schema::Entity for #name #ty_generics #where_clause {
            #kind_fn

            fn describe(builder: &mut docmap::schema::SchemaBuilder<Self>) {
                #name_call
                #(#index_calls)*
                #(#text_index_calls)*
                #(#field_calls)*
            }
        }
    };

    Ok(TokenStream::from(gen))
}

fn parse_property(field: &Field) -> Result<PropertyAttr> {
    let mut property = PropertyAttr::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("property") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let s: LitStr = meta.value()?.parse()?;
                property.name = Some(s.value());
                Ok(())
            } else if meta.path.is_ident("id") {
                property.id = true;
                Ok(())
            } else if meta.path.is_ident("overflow") {
                property.overflow = true;
                Ok(())
            } else if meta.path.is_ident("transient") {
                property.transient = true;
                Ok(())
            } else if meta.path.is_ident("base") {
                property.base = true;
                Ok(())
            } else if meta.path.is_ident("indexed") {
                property.indexed = Some(parse_indexed(&meta)?);
                Ok(())
            } else {
                Err(meta.error("Unknown property attribute"))
            }
        })?;
    }

    if property.base && (property.name.is_some() || property.id || property.overflow || property.indexed.is_some()) {
        return Err(syn::Error::new_spanned(
            field,
            "a base field cannot carry other property attributes",
        ));
    }
    Ok(property)
}

fn parse_indexed(meta: &ParseNestedMeta) -> Result<IndexedAttr> {
    let mut indexed = IndexedAttr::default();
    if !meta.input.peek(syn::token::Paren) {
        return Ok(indexed);
    }
    meta.parse_nested_meta(|meta| {
        if meta.path.is_ident("name") {
            let s: LitStr = meta.value()?.parse()?;
            indexed.name = Some(s.value());
            Ok(())
        } else if meta.path.is_ident("descending") {
            indexed.descending = true;
            Ok(())
        } else if meta.path.is_ident("unique") {
            indexed.unique = true;
            Ok(())
        } else if meta.path.is_ident("sparse") {
            indexed.sparse = true;
            Ok(())
        } else {
            Err(meta.error("Unknown indexed attribute"))
        }
    })?;
    Ok(indexed)
}

fn parse_index(meta: &ParseNestedMeta) -> Result<IndexAttr> {
    let mut index = IndexAttr::default();
    meta.parse_nested_meta(|meta| {
        if meta.path.is_ident("fields") {
            let s: LitStr = meta.value()?.parse()?;
            index.fields = split_list(&s.value());
            Ok(())
        } else if meta.path.is_ident("name") {
            let s: LitStr = meta.value()?.parse()?;
            index.name = Some(s.value());
            Ok(())
        } else if meta.path.is_ident("unique") {
            index.unique = true;
            Ok(())
        } else if meta.path.is_ident("sparse") {
            index.sparse = true;
            Ok(())
        } else {
            Err(meta.error("Unknown index attribute"))
        }
    })?;
    if index.fields.is_empty() {
        return Err(meta.error("Index fields are required"));
    }
    Ok(index)
}

fn parse_text_index(meta: &ParseNestedMeta) -> Result<TextIndexAttr> {
    let mut index = TextIndexAttr::default();
    meta.parse_nested_meta(|meta| {
        if meta.path.is_ident("fields") {
            let s: LitStr = meta.value()?.parse()?;
            index.fields = split_list(&s.value());
            Ok(())
        } else if meta.path.is_ident("name") {
            let s: LitStr = meta.value()?.parse()?;
            index.name = Some(s.value());
            Ok(())
        } else if meta.path.is_ident("language") {
            let s: LitStr = meta.value()?.parse()?;
            index.language = Some(s.value());
            Ok(())
        } else {
            Err(meta.error("Unknown text index attribute"))
        }
    })?;
    if index.fields.is_empty() {
        return Err(meta.error("Text index fields are required"));
    }
    Ok(index)
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|field| field.trim().to_string())
        .filter(|field| !field.is_empty())
        .collect()
}

fn indexed_tokens(indexed: &IndexedAttr) -> TokenStream2 {
    let mut tokens = quote! { docmap::index::IndexedDecl::new() };
    if let Some(name) = &indexed.name {
        tokens = quote! { #tokens.name(#name) };
    }
    if indexed.descending {
        tokens = quote! { #tokens.descending() };
    }
    if indexed.unique {
        tokens = quote! { #tokens.unique() };
    }
    if indexed.sparse {
        tokens = quote! { #tokens.sparse() };
    }
    tokens
}

fn index_tokens(index: &IndexAttr) -> TokenStream2 {
    let fields = &index.fields;
    let mut decl = quote! { docmap::index::IndexDecl::new(&[#(#fields),*]) };
    if let Some(name) = &index.name {
        decl = quote! { #decl.name(#name) };
    }
    if index.unique {
        decl = quote! { #decl.unique() };
    }
    if index.sparse {
        decl = quote! { #decl.sparse() };
    }
    quote! { builder.index(#decl); }
}

fn text_index_tokens(index: &TextIndexAttr) -> TokenStream2 {
    let fields = &index.fields;
    let mut decl = quote! { docmap::index::TextIndexDecl::new(&[#(#fields),*]) };
    if let Some(name) = &index.name {
        decl = quote! { #decl.name(#name) };
    }
    if let Some(language) = &index.language {
        decl = quote! { #decl.language(#language) };
    }
    quote! { builder.text_index(#decl); }
}
