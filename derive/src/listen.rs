use std::{
    fmt::Display,
    ops::{
        Index,
        IndexMut,
    },
};

use proc_macro2::{
    Span,
    TokenStream,
};
use quote::{
    quote,
    ToTokens,
};
use syn::{
    spanned::Spanned,
    Data,
    DataStruct,
    DeriveInput,
    Error,
    Fields,
    Result,
};

use self::attributes::HelperAttr;

mod attributes;
mod fields;

pub(super) fn derive_listen(input: DeriveInput) -> Result<TokenStream> {
    let fields = match input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => fields.named,
        _ => return Err(syn::Error::new(input.ident.span(), "this derive macro only works on structs with named fields")),
    };
    let target = &input.ident;

    let outer_attrs = attributes::parse(&input.attrs)?;
    let tagged = attributes::process(&outer_attrs)?.merge(fields::process(&fields)?);
    let move_impl = match (&tagged.track, &tagged.artist) {
        (Some(TaggedField { member: track, .. }), Some(TaggedField { member: artist, .. })) => {
            let release = tagged.release.as_ref().map_or_else(
                || quote!(::core::option::Option::None::<::std::string::String>),
                |r| {
                    let path = r.member;
                    quote!(listen.#path)
                },
            );
            quote! {
                #[automatically_derived]
                impl ::core::convert::TryFrom<#target> for ::lb_importer_core::Listen {
                    type Error = ::lb_importer_core::ValidationError;

                    fn try_from(listen: #target) -> ::core::result::Result<Self, Self::Error> {
                        let listened_at = ::lb_importer_core::ListenData::listened_at(&listen);
                        let additional_info = ::lb_importer_core::ListenData::track_metadata(&listen)
                            .as_ref()
                            .and_then(crate::service::additional_info);
                        ::lb_importer_core::CanonicalTrack::from_source_fields(listen.#artist, listen.#track, #release, additional_info)
                            .map(|track| ::lb_importer_core::Listen::new(listened_at, track))
                    }
                }
            }
        },
        _ => TokenStream::default(),
    };

    Ok(quote! {
        impl ::lb_importer_core::IntoListenDerive for #target { }
        #[automatically_derived]
        impl ::core::convert::TryFrom<&#target> for ::lb_importer_core::Listen {
            type Error = ::lb_importer_core::ValidationError;

            fn try_from(listen: &#target) -> ::core::result::Result<Self, Self::Error> {
                ::lb_importer_core::CanonicalTrack::from_source_fields(
                    ::lb_importer_core::ListenData::artist_name(listen),
                    ::lb_importer_core::ListenData::track_name(listen),
                    ::lb_importer_core::ListenData::release_name(listen),
                    ::lb_importer_core::ListenData::track_metadata(listen)
                        .as_ref()
                        .and_then(crate::service::additional_info),
                )
                .map(|track| ::lb_importer_core::Listen::new(::lb_importer_core::ListenData::listened_at(listen), track))
            }
        }
        #move_impl
    })
}


pub(self) struct TaggedField<'f> {
    pub member: &'f dyn ToTokens,
    pub source: Option<&'f dyn Spanned>,
}

#[derive(Default)]
pub(self) struct TaggedFields<'f> {
    pub track: Option<TaggedField<'f>>,
    pub artist: Option<TaggedField<'f>>,
    pub release: Option<TaggedField<'f>>,
}

impl<'f> TaggedFields<'f> {
    fn assign(&mut self, role: HelperAttr, member: &'f dyn ToTokens, source: Option<&'f dyn Spanned>) -> Option<TaggedField<'f>> {
        self[role].replace(TaggedField { member, source })
    }

    fn try_assign(mut self, role: HelperAttr, member: &'f dyn ToTokens, source: Option<&'f dyn Spanned>) -> Result<Self> {
        fn ptr_eq<A: ?Sized, B: ?Sized>(a: *const A, b: *const B) -> bool { std::ptr::eq(a as *const (), b as *const ()) }

        match self.assign(role, member, source) {
            Some(TaggedField {
                member: prev_mem,
                source: prev_source,
            }) => {
                let span = source.map(Spanned::span).unwrap_or_else(Span::call_site);
                Err(if ptr_eq(member, prev_mem) {
                    const MSG: &str = "Duplicate attribute";
                    let mut e = Error::new(span, MSG);
                    if let Some(prev) = prev_source {
                        e.combine(Error::new(prev.span(), MSG));
                    }
                    e
                } else {
                    fn msg(id: impl Display) -> String { format!("Not allowed on multiple fields. Also present on '{id}'") }
                    let mut e = Error::new(span, msg(prev_mem.to_token_stream()));
                    if let Some(source) = prev_source {
                        e.combine(Error::new(source.span(), msg(member.to_token_stream())));
                    }
                    e
                })
            },
            None => Ok(self),
        }
    }

    /// Explicit tags in `other` win over anything already in `self`
    fn merge(self, other: Self) -> Self {
        Self {
            track: other.track.or(self.track),
            artist: other.artist.or(self.artist),
            release: other.release.or(self.release),
        }
    }
}

impl<'f> Index<HelperAttr> for TaggedFields<'f> {
    type Output = Option<TaggedField<'f>>;

    fn index(&self, index: HelperAttr) -> &Self::Output {
        match index {
            HelperAttr::Track => &self.track,
            HelperAttr::Artist => &self.artist,
            HelperAttr::Release => &self.release,
            HelperAttr::Listen => unreachable!("`listen` does not name a field"),
        }
    }
}
impl IndexMut<HelperAttr> for TaggedFields<'_> {
    fn index_mut(&mut self, index: HelperAttr) -> &mut Self::Output {
        match index {
            HelperAttr::Track => &mut self.track,
            HelperAttr::Artist => &mut self.artist,
            HelperAttr::Release => &mut self.release,
            HelperAttr::Listen => unreachable!("`listen` does not name a field"),
        }
    }
}
