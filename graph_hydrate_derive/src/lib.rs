use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, Type, parse_macro_input, spanned::Spanned};

/// Derives `Entity` and `EntityModel` for a struct with named fields.
///
/// Field attributes:
/// - `#[key]` marks a primary key member; several form a composite key in
///   declaration order.
/// - `#[reference(target = T, foreign_key = "..")]` marks an
///   `Option<EntityHandle>` field loaded through the owner's foreign key.
/// - `#[collection(target = T, foreign_key = "..")]` marks a
///   `Vec<EntityHandle>` field loaded through the target's foreign key.
/// - `#[entity(skip)]` hides a field from the generated accessors.
///
/// Every other field is exposed through `property` and must implement
/// `ToKeyValue` (integers up to `i64`, `String`, `bool`, `KeyValue` and
/// `Option`s of those). Floats, `u64`, timestamps and other types need
/// `#[entity(skip)]`.
///
/// `#[entity(table = "..")]` on the struct overrides the table name.
#[proc_macro_derive(Entity, attributes(entity, key, reference, collection))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct EntityOptions {
    table_name: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum NavigationKind {
    Reference,
    Collection,
}

struct NavigationField {
    ident: Ident,
    kind: NavigationKind,
    target: Type,
    foreign_key: String,
}

#[derive(Default)]
struct FieldOptions {
    key: bool,
    skip: bool,
    navigation: Option<(NavigationKind, Type, String)>,
}

fn expand_entity(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "Entity does not support generic structs",
        ));
    }

    let options = parse_entity_options(&input.attrs)?;

    let data_struct = match input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Entity can only be derived for structs",
            ));
        }
    };

    let named_fields = match data_struct.fields {
        Fields::Named(fields) => fields,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Entity requires named fields",
            ));
        }
    };

    let mut keys = Vec::<Ident>::new();
    let mut scalars = Vec::<Ident>::new();
    let mut navigations = Vec::<NavigationField>::new();

    for field in named_fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Entity requires named fields"))?;
        let field_options = parse_field_options(&field.attrs)?;

        if let Some((kind, target, foreign_key)) = field_options.navigation {
            if field_options.key {
                return Err(syn::Error::new(
                    ident.span(),
                    "a navigation field cannot be a #[key]",
                ));
            }
            navigations.push(NavigationField {
                ident,
                kind,
                target,
                foreign_key,
            });
            continue;
        }

        if field_options.skip {
            if field_options.key {
                return Err(syn::Error::new(
                    ident.span(),
                    "#[entity(skip)] cannot be combined with #[key]",
                ));
            }
            continue;
        }

        if field_options.key {
            keys.push(ident.clone());
        }
        scalars.push(ident);
    }

    let table_call = options.table_name.map(|table| quote! { .table(#table) });

    let key_calls = keys.iter().map(|ident| {
        let name = ident.to_string();
        quote! { .key(#name) }
    });

    let relationship_calls = navigations.iter().map(|nav| {
        let name = nav.ident.to_string();
        let target = &nav.target;
        let foreign_key = &nav.foreign_key;
        match nav.kind {
            NavigationKind::Reference => quote! {
                .reference(#name, ::graph_hydrate::EntityType::of::<#target>(), #foreign_key)
            },
            NavigationKind::Collection => quote! {
                .collection(#name, ::graph_hydrate::EntityType::of::<#target>(), #foreign_key)
            },
        }
    });

    let property_arms = scalars.iter().map(|ident| {
        let name = ident.to_string();
        quote! {
            #name => Ok(::graph_hydrate::ToKeyValue::to_key_value(&self.#ident)),
        }
    });

    let navigation_arms = navigations.iter().map(|nav| {
        let ident = &nav.ident;
        let name = ident.to_string();
        match nav.kind {
            NavigationKind::Reference => quote! {
                #name => Ok(::graph_hydrate::Navigation::Reference(self.#ident.clone())),
            },
            NavigationKind::Collection => quote! {
                #name => Ok(::graph_hydrate::Navigation::Collection(self.#ident.clone())),
            },
        }
    });

    let set_navigation_arms = navigations.iter().map(|nav| {
        let ident = &nav.ident;
        let name = ident.to_string();
        match nav.kind {
            NavigationKind::Reference => quote! {
                #name => match value {
                    ::graph_hydrate::Navigation::Reference(target) => {
                        self.#ident = target;
                        Ok(())
                    }
                    _ => Err(::graph_hydrate::GraphError::NavigationMismatch {
                        type_name: ::std::any::type_name::<Self>().to_string(),
                        relationship: name.to_string(),
                        expected: "reference",
                    }),
                },
            },
            NavigationKind::Collection => quote! {
                #name => match value {
                    ::graph_hydrate::Navigation::Collection(items) => {
                        self.#ident = items;
                        Ok(())
                    }
                    _ => Err(::graph_hydrate::GraphError::NavigationMismatch {
                        type_name: ::std::any::type_name::<Self>().to_string(),
                        relationship: name.to_string(),
                        expected: "collection",
                    }),
                },
            },
        }
    });

    let not_found = quote! {
        Err(::graph_hydrate::GraphError::PropertyNotFound {
            type_name: ::std::any::type_name::<Self>().to_string(),
            property: name.to_string(),
        })
    };

    Ok(quote! {
        impl ::graph_hydrate::Entity for #struct_name {
            fn entity_type(&self) -> ::graph_hydrate::EntityType {
                ::graph_hydrate::EntityType::of::<Self>()
            }

            fn property(&self, name: &str) -> ::graph_hydrate::Result<::graph_hydrate::KeyValue> {
                match name {
                    #(#property_arms)*
                    _ => #not_found,
                }
            }

            fn navigation(&self, name: &str) -> ::graph_hydrate::Result<::graph_hydrate::Navigation> {
                match name {
                    #(#navigation_arms)*
                    _ => #not_found,
                }
            }

            #[allow(unused_variables)]
            fn set_navigation(
                &mut self,
                name: &str,
                value: ::graph_hydrate::Navigation,
            ) -> ::graph_hydrate::Result<()> {
                match name {
                    #(#set_navigation_arms)*
                    _ => #not_found,
                }
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }

        impl ::graph_hydrate::EntityModel for #struct_name {
            fn metadata() -> ::graph_hydrate::EntityMetadata {
                ::graph_hydrate::EntityMetadata::new(::graph_hydrate::EntityType::of::<Self>())
                    #table_call
                    #(#key_calls)*
                    #(#relationship_calls)*
            }
        }
    })
}

fn parse_entity_options(attrs: &[Attribute]) -> syn::Result<EntityOptions> {
    let mut options = EntityOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.table_name = Some(lit.value());
                return Ok(());
            }

            Err(meta.error("Unsupported entity attribute. Supported: table = \"...\""))
        })?;
    }

    Ok(options)
}

fn parse_field_options(attrs: &[Attribute]) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for attr in attrs {
        if attr.path().is_ident("key") {
            if !matches!(attr.meta, syn::Meta::Path(_)) {
                return Err(syn::Error::new(attr.span(), "#[key] does not accept arguments"));
            }
            options.key = true;
            continue;
        }

        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    options.skip = true;
                    return Ok(());
                }

                Err(meta.error("Unsupported #[entity(...)] field option. Supported: skip"))
            })?;
            continue;
        }

        let kind = if attr.path().is_ident("reference") {
            NavigationKind::Reference
        } else if attr.path().is_ident("collection") {
            NavigationKind::Collection
        } else {
            continue;
        };

        if options.navigation.is_some() {
            return Err(syn::Error::new(
                attr.span(),
                "a field can carry only one #[reference] or #[collection] attribute",
            ));
        }

        let mut target = None::<Type>;
        let mut foreign_key = None::<String>;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("target") {
                let value = meta.value()?;
                target = Some(value.parse()?);
                return Ok(());
            }

            if meta.path.is_ident("foreign_key") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                foreign_key = Some(lit.value());
                return Ok(());
            }

            Err(meta.error(
                "Unsupported navigation option. Supported: target = Type, foreign_key = \"...\"",
            ))
        })?;

        let target = target.ok_or_else(|| {
            syn::Error::new(attr.span(), "navigation attribute requires target = Type")
        })?;
        let foreign_key = foreign_key.ok_or_else(|| {
            syn::Error::new(attr.span(), "navigation attribute requires foreign_key = \"...\"")
        })?;
        options.navigation = Some((kind, target, foreign_key));
    }

    Ok(options)
}
