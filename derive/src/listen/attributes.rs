use std::str::FromStr;

use syn::{
    parse::{
        Parse,
        ParseStream,
    },
    punctuated::Punctuated,
    Attribute,
    Expr,
    Ident,
    Token,
};

use super::TaggedFields;

#[derive(Clone, Copy)]
pub enum HelperAttr {
    Track,
    Artist,
    Release,
    Listen,
}

impl FromStr for HelperAttr {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "track" => Ok(Self::Track),
            "artist" => Ok(Self::Artist),
            "release" => Ok(Self::Release),
            "listen" => Ok(Self::Listen),
            _ => Err(()),
        }
    }
}

impl TryFrom<&Ident> for HelperAttr {
    type Error = ();

    fn try_from(value: &Ident) -> Result<Self, Self::Error> { Self::from_str(&value.to_string()) }
}


/// One `role = member.path` entry of an outer `#[listen(...)]`
pub(super) struct ListenAttr {
    role: HelperAttr,
    id: Ident,
    _eq: Token![=],
    member: Expr,
}

impl Parse for ListenAttr {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let id: Ident = input.parse()?;
        let role = match HelperAttr::try_from(&id) {
            Ok(HelperAttr::Listen) | Err(_) => {
                return Err(syn::Error::new(id.span(), "Invalid field name; expected `track`, `artist`, or `release`"))
            },
            Ok(role) => role,
        };

        Ok(ListenAttr {
            role,
            id,
            _eq: input.parse()?,
            member: input.parse()?,
        })
    }
}


pub(super) fn parse(attrs: &[Attribute]) -> syn::Result<Vec<ListenAttr>> {
    attrs
        .iter()
        .filter(|a| a.path.is_ident("listen"))
        .map(|a| a.parse_args_with(Punctuated::<ListenAttr, Token![,]>::parse_terminated))
        .try_fold(Vec::new(), |mut v, pr| pr.map(|x| v.extend(x)).and(Ok(v)))
}

pub(super) fn process(attrs: &[ListenAttr]) -> syn::Result<TaggedFields<'_>> {
    attrs
        .iter()
        .try_fold(TaggedFields::default(), |tf, a| tf.try_assign(a.role, &a.member, Some(&a.id)))
}
