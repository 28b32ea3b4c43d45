mod model;
mod route;

use proc_macro::TokenStream;

/// Creates a documentation function for the route, named after the original function
/// with the suffix `_docs`.
///
/// The first line of the doc comment becomes the operation summary, the rest becomes
/// its description.
#[proc_macro_attribute]
pub fn route(args: TokenStream, input: TokenStream) -> TokenStream {
	route::from_input(args, input)
}

/// Creates an `XInput` struct for the model, used as the request body when creating
/// or replacing it.
///
/// Fields with `#[serde(skip_deserializing)]` or `#[serde(skip)]` are left out, all other
/// fields are copied with their attributes. Row-mapping derives such as `FromRow` and
/// `#[sqlx(..)]` field attributes are not copied.
#[proc_macro_attribute]
pub fn model(_args: TokenStream, input: TokenStream) -> TokenStream {
	model::from_input(input)
}
