#[cfg(feature = "rustc-hash")]
pub type FastMap<K, V> = rustc_hash::FxHashMap<K, V>;

#[cfg(not(feature = "rustc-hash"))]
pub type FastMap<K, V> = std::collections::HashMap<K, V>;
