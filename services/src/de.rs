use std::marker::PhantomData;

use serde::{
    de::{
        DeserializeOwned,
        SeqAccess,
        Visitor,
    },
    Deserialize,
};
use serde_json::Value;
use time::{
    format_description::{
        well_known::Rfc3339,
        FormatItem,
    },
    macros::format_description,
    OffsetDateTime,
    PrimitiveDateTime,
};
use tracing::warn;


/// RFC 3339, or `YYYY-MM-DD HH:MM` assumed to be UTC
pub fn datetime<'de, D>(de: D) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    const SIMPLE_FMT: &[FormatItem] = format_description!("[year]-[month]-[day] [hour]:[minute]");

    let val = String::deserialize(de)?;
    OffsetDateTime::parse(&val, &Rfc3339)
        .or_else(|_| PrimitiveDateTime::parse(&val, SIMPLE_FMT).map(PrimitiveDateTime::assume_utc))
        .map_err(serde::de::Error::custom)
}


struct SkipErrors<T>(PhantomData<T>);
impl<'de, T: DeserializeOwned> Visitor<'de> for SkipErrors<T> {
    type Value = Vec<T>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result { formatter.write_str("a sequence") }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut values = Vec::with_capacity(seq.size_hint().unwrap_or_default());
        let mut index = 0usize;
        while let Some(entry) = seq.next_element::<Value>()? {
            match T::deserialize(&entry) {
                Ok(listen) => values.push(listen),
                Err(e) => warn!("Skipping entry {index}: {e:#}"),
            }
            index += 1;
        }
        Ok(values)
    }
}

/// Deserializes a sequence, dropping (and logging) every element that doesn't match `T`
pub fn vec_skip_errors<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: DeserializeOwned,
{
    de.deserialize_seq(SkipErrors(PhantomData))
}
