//! TableRow derive macro implementation

use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

enum FieldKind {
    /// Ordinary column, carrying its mapped name.
    Column(String),
    Skip,
    Flatten,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "TableRow can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "TableRow can only be derived for structs",
            ));
        }
    };

    let mut column_pushes = Vec::new();
    let mut value_pushes = Vec::new();
    let mut field_inits = Vec::new();

    for field in fields {
        let field_name = field.ident.as_ref().unwrap();
        let field_ty = &field.ty;
        match field_kind(field)? {
            FieldKind::Column(column) => {
                column_pushes.push(quote! {
                    cols.push(#column);
                });
                value_pushes.push(quote! {
                    out.push(sqlbind::ToValue::to_value(&self.#field_name));
                });
                field_inits.push(quote! {
                    #field_name: r.next(#column)?
                });
            }
            FieldKind::Skip => {
                field_inits.push(quote! {
                    #field_name: ::std::default::Default::default()
                });
            }
            FieldKind::Flatten => {
                column_pushes.push(quote! {
                    <#field_ty as sqlbind::TableRow>::push_columns(cols);
                });
                value_pushes.push(quote! {
                    sqlbind::TableRow::push_values(&self.#field_name, out);
                });
                field_inits.push(quote! {
                    #field_name: <#field_ty as sqlbind::TableRow>::from_row(r)?
                });
            }
        }
    }

    Ok(quote! {
        impl #impl_generics sqlbind::TableRow for #name #ty_generics #where_clause {
            fn push_columns(cols: &mut ::std::vec::Vec<&'static str>) {
                #(#column_pushes)*
            }

            fn push_values(&self, out: &mut ::std::vec::Vec<sqlbind::Value>) {
                #(#value_pushes)*
            }

            fn from_row(r: &mut sqlbind::RowReader<'_>) -> sqlbind::DbResult<Self> {
                Ok(Self {
                    #(#field_inits),*
                })
            }
        }
    })
}

fn field_kind(field: &syn::Field) -> Result<FieldKind> {
    let field_name = field.ident.as_ref().unwrap();
    for attr in &field.attrs {
        if !attr.path().is_ident("col") {
            continue;
        }
        let meta = attr.parse_args::<syn::Meta>()?;
        if meta.path().is_ident("skip") {
            return Ok(FieldKind::Skip);
        }
        if meta.path().is_ident("flatten") {
            return Ok(FieldKind::Flatten);
        }
        if meta.path().is_ident("rename") {
            if let syn::Meta::NameValue(nv) = &meta {
                if let syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(lit),
                    ..
                }) = &nv.value
                {
                    return Ok(FieldKind::Column(lit.value()));
                }
            }
            return Err(syn::Error::new_spanned(
                attr,
                "expected #[col(rename = \"...\")]",
            ));
        }
        return Err(syn::Error::new_spanned(
            attr,
            "unknown #[col(...)] attribute; expected rename, skip or flatten",
        ));
    }
    Ok(FieldKind::Column(field_name.to_string().to_snake_case()))
}
