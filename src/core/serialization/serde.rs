/*!
 * Serde Helper Functions
 *
 * Skip predicates for `#[serde(skip_serializing_if = "...")]` so that
 * serialized handles and spawn options only carry the fields that are set,
 * and a map deserializer that refuses repeated keys.
 */

use serde::de::{Deserialize, Deserializer, Error, MapAccess, Visitor};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;

/// Skip serializing if Option is None
#[inline]
pub const fn is_none<T>(value: &Option<T>) -> bool {
    value.is_none()
}

/// Skip serializing if the map is empty
#[inline]
pub fn is_empty_map<K, V>(value: &BTreeMap<K, V>) -> bool {
    value.is_empty()
}

/// Deserialize a string-keyed map, failing on a key that appears twice
///
/// Plain map deserialization keeps the last value of a repeated key.
pub fn unique_map<'de, D, V>(deserializer: D) -> Result<HashMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct UniqueMap<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for UniqueMap<V> {
        type Value = HashMap<String, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map without repeated keys")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = HashMap::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, value)) = access.next_entry::<String, V>()? {
                if map.contains_key(&key) {
                    return Err(A::Error::custom(format!("duplicate key `{}`", key)));
                }
                map.insert(key, value);
            }
            Ok(map)
        }
    }

    deserializer.deserialize_map(UniqueMap(PhantomData))
}
