extern crate proc_macro;

use proc_macro::TokenStream;
use syn::{
    parse_macro_input,
    DeriveInput,
};

mod listen;
use listen::derive_listen;


/// Implements `TryFrom<T>` and `TryFrom<&T>` for `lb_importer_core::Listen`
///
/// The target must implement `ListenData`. The owned conversion moves the track, artist and release out of the
/// fields named `track`, `artist` and `release`, or the fields tagged with `#[track]`, `#[artist]` and `#[release]`,
/// or nested members given with `#[listen(track = some.path, ...)]` on the struct. The release member must be an `Option`.
#[proc_macro_derive(IntoListen, attributes(track, artist, release, listen))]
pub fn derive_into_listen(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_listen(input).unwrap_or_else(|e| e.to_compile_error()).into()
}
