use darling::{ast, FromDeriveInput, FromField};
use proc_macro2::TokenTree;
use quote::{format_ident, quote, ToTokens};
use syn::{punctuated::Punctuated, Meta, Token};

#[derive(Debug, FromDeriveInput)]
#[darling(supports(struct_named), forward_attrs)]
struct ModelInputReceiver {
	ident: syn::Ident,

	generics: syn::Generics,

	data: ast::Data<(), ModelFieldReceiver>,

	attrs: Vec<syn::Attribute>,
}

#[derive(Debug, FromField)]
#[darling(forward_attrs)]
struct ModelFieldReceiver {
	ident: Option<syn::Ident>,

	ty: syn::Type,
	vis: syn::Visibility,

	attrs: Vec<syn::Attribute>,
}

/// Whether the attribute is `#[serde(..)]` containing `skip` or `skip_deserializing`.
fn is_skipped(attr: &syn::Attribute) -> bool {
	let Meta::List(ref list) = attr.meta else {
		return false;
	};

	if !list.path.is_ident("serde") {
		return false;
	}

	list.tokens.to_token_stream().into_iter().any(|token| {
		matches!(token, TokenTree::Ident(ref ident) if ident == "skip_deserializing" || ident == "skip")
	})
}

/// Rewrites a struct attribute for the input struct.
///
/// Doc comments are dropped (the input gets its own) and `FromRow` is removed
/// from derive lists, since inputs never come from the database.
fn input_attr(attr: &syn::Attribute) -> syn::Result<Option<syn::Attribute>> {
	if attr.path().is_ident("doc") {
		return Ok(None);
	}

	if !attr.path().is_ident("derive") {
		return Ok(Some(attr.clone()));
	}

	let paths = attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)?;
	let kept = paths
		.into_iter()
		.filter(|path| path.segments.last().map_or(true, |segment| segment.ident != "FromRow"));

	Ok(Some(syn::parse_quote!(#[derive(#(#kept),*)])))
}

pub fn from_input(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
	let input = syn::parse_macro_input!(input as syn::DeriveInput);
	let receiver = match ModelInputReceiver::from_derive_input(&input) {
		Ok(x) => x,
		Err(e) => return e.write_errors().into(),
	};

	let ident = &receiver.ident;
	let vis = &input.vis;
	let generics = &receiver.generics;
	let input_ident = format_ident!("{}Input", ident);
	let doc = format!("Request body used to create or replace a [`{ident}`].");

	let attrs = match receiver
		.attrs
		.iter()
		.filter_map(|attr| input_attr(attr).transpose())
		.collect::<syn::Result<Vec<_>>>()
	{
		Ok(attrs) => attrs,
		Err(e) => return e.to_compile_error().into(),
	};

	let Some(fields) = receiver.data.take_struct() else {
		return syn::Error::new_spanned(ident, "#[model] only supports structs with named fields")
			.to_compile_error()
			.into();
	};

	let fields = fields.iter().filter_map(|field| {
		let ident = field.ident.as_ref()?;

		if field.attrs.iter().any(is_skipped) {
			return None;
		}

		let ty = &field.ty;
		let vis = &field.vis;
		let attrs = field.attrs.iter().filter(|attr| !attr.path().is_ident("sqlx"));

		Some(quote! {
			#(#attrs)*
			#vis #ident: #ty,
		})
	});

	quote! {
		#input

		#[doc = #doc]
		#(#attrs)*
		#vis struct #input_ident #generics {
			#(
				#fields
			)*
		}
	}
	.into()
}
