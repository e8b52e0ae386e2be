use std::str::FromStr;

use syn::{
    punctuated::Punctuated,
    spanned::Spanned,
    token,
    Field,
    Result,
};

use super::{
    attributes::HelperAttr,
    TaggedFields,
};

/// Collects fields that are either named after a role or tagged with one. Tags override names.
pub(super) fn process(fields: &Punctuated<Field, token::Comma>) -> Result<TaggedFields<'_>> {
    let mut named = TaggedFields::default();
    fields
        .iter()
        .inspect(|&f| named.assign_implicit(f))
        .flat_map(|f| {
            f.attrs.iter().filter_map(move |a| {
                a.path
                    .get_ident()
                    .map(ToString::to_string)
                    .and_then(|i| HelperAttr::from_str(i.as_str()).ok())
                    .map(|role| (role, f, a))
            })
        })
        .try_fold(TaggedFields::default(), |tagged, (role, field, a)| match (role, field.ident.as_ref()) {
            (HelperAttr::Listen, _) => Err(syn::Error::new(a.span(), "Not allowed on fields. Must be placed on outer struct")),
            (_, Some(ident)) => tagged.try_assign(role, ident, Some(a)),
            (_, None) => Err(syn::Error::new(field.span(), "Field must be named")),
        })
        .map(|t| named.merge(t))
}


impl<'f> TaggedFields<'f> {
    fn assign_implicit(&mut self, field: &'f Field) {
        if let Some((role, ident)) = field
            .ident
            .as_ref()
            .and_then(|i| HelperAttr::from_str(&i.to_string()).ok().map(|role| (role, i)))
            .filter(|(role, _)| !matches!(role, HelperAttr::Listen))
        {
            self.assign(role, ident, None);
        }
    }
}
