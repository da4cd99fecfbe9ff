use smallvec::SmallVec;
use smartstring::alias::String as KeyString;
use std::{
    fmt::{self, Debug, Formatter},
    marker::PhantomData,
    ops::Index,
};

/// Key comparison policy for an [`OrderedMap`].
pub trait KeyCase {
    /// whether two keys are considered the same
    fn key_eq(a: &str, b: &str) -> bool;
}

/// Exact key comparison, used for cookies and form data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaseSensitive;

/// ASCII-case-insensitive key comparison, used for HTTP headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaseInsensitive;

impl KeyCase for CaseSensitive {
    fn key_eq(a: &str, b: &str) -> bool {
        a == b
    }
}

impl KeyCase for CaseInsensitive {
    fn key_eq(a: &str, b: &str) -> bool {
        a.eq_ignore_ascii_case(b)
    }
}

/// An insertion-ordered multimap.
///
/// The map may hold several entries for the same key; iteration yields
/// entries in insertion order, and equality compares entries pairwise in
/// that order. Key comparison is delegated to the `C` parameter.
#[must_use]
pub struct OrderedMap<V = String, C = CaseSensitive> {
    entries: SmallVec<[(KeyString, V); 8]>,
    case: PhantomData<C>,
}

/// HTTP header map: string values, case-insensitive keys.
pub type Headers = OrderedMap<String, CaseInsensitive>;

/// Cookie/query/form map: string values, case-sensitive keys.
pub type DataMap = OrderedMap<String, CaseSensitive>;

impl<V, C> Default for OrderedMap<V, C> {
    fn default() -> Self {
        Self {
            entries: SmallVec::new(),
            case: PhantomData,
        }
    }
}

impl<V: Clone, C> Clone for OrderedMap<V, C> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            case: PhantomData,
        }
    }
}

impl<V: Debug, C> Debug for OrderedMap<V, C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k.as_str(), v)))
            .finish()
    }
}

impl<V: PartialEq, C: KeyCase> PartialEq for OrderedMap<V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|((ak, av), (bk, bv))| C::key_eq(ak, bk) && av == bv)
    }
}

impl<V: Eq, C: KeyCase> Eq for OrderedMap<V, C> {}

impl<V, C: KeyCase> OrderedMap<V, C> {
    /// Constructs an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, counting duplicate keys individually.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds an entry, keeping any existing entries with the same key.
    pub fn append(&mut self, name: impl Into<KeyString>, value: impl Into<V>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces the first entry with this key, or appends when absent.
    /// Later duplicates are untouched.
    pub fn set(&mut self, name: impl Into<KeyString>, value: impl Into<V>) {
        let name = name.into();
        let existing = self
            .entries
            .iter()
            .position(|(key, _)| C::key_eq(key, &name));
        match existing {
            Some(index) => self.entries[index].1 = value.into(),
            None => self.entries.push((name, value.into())),
        }
    }

    /// The first value for this key.
    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(key, _)| C::key_eq(key, name))
            .map(|(_, value)| value)
    }

    /// Mutable access to the first value for this key.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        self.entries
            .iter_mut()
            .find(|(key, _)| C::key_eq(key, name))
            .map(|(_, value)| value)
    }

    /// Mutable access to the first value for this key, appending an
    /// entry with a default value when the key is absent.
    pub fn get_or_insert_mut(&mut self, name: impl Into<KeyString>) -> &mut V
    where
        V: Default,
    {
        let name = name.into();
        let index = match self
            .entries
            .iter()
            .position(|(key, _)| C::key_eq(key, &name))
        {
            Some(index) => index,
            None => {
                self.entries.push((name, V::default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    /// All values for this key, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a V> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| C::key_eq(key, name))
            .map(|(_, value)| value)
    }

    /// Whether any entry has this key.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of entries with this key.
    pub fn count(&self, name: &str) -> usize {
        self.get_all(name).count()
    }

    /// Removes every entry with this key, returning how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(key, _)| !C::key_eq(key, name));
        before - self.entries.len()
    }

    /// The earliest-inserted entry.
    pub fn front(&self) -> Option<(&str, &V)> {
        self.entries.first().map(|(k, v)| (k.as_str(), v))
    }

    /// Mutable access to the most recently inserted entry.
    pub fn back_mut(&mut self) -> Option<(&str, &mut V)> {
        self.entries.last_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Borrowing iterator over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<C: KeyCase> Index<&str> for OrderedMap<String, C> {
    type Output = str;

    /// The first value for this key, or `""` when absent.
    fn index(&self, name: &str) -> &Self::Output {
        self.get(name).map(String::as_str).unwrap_or_default()
    }
}

impl<V, C: KeyCase, K: Into<KeyString>, IV: Into<V>> Extend<(K, IV)> for OrderedMap<V, C> {
    fn extend<T: IntoIterator<Item = (K, IV)>>(&mut self, iter: T) {
        for (name, value) in iter {
            self.append(name, value);
        }
    }
}

impl<V, C: KeyCase, K: Into<KeyString>, IV: Into<V>> FromIterator<(K, IV)> for OrderedMap<V, C> {
    fn from_iter<T: IntoIterator<Item = (K, IV)>>(iter: T) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<'a, V, C> IntoIterator for &'a OrderedMap<V, C> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        Iter(self.entries.iter())
    }
}

/// Borrowing iterator for [`OrderedMap`].
#[derive(Debug)]
pub struct Iter<'a, V>(std::slice::Iter<'a, (KeyString, V)>);

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, v)| (k.as_str(), v))
    }
}

impl<V, C> IntoIterator for OrderedMap<V, C> {
    type Item = (String, V);
    type IntoIter = IntoIter<V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self.entries.into_iter())
    }
}

/// Owning iterator for [`OrderedMap`].
#[derive(Debug)]
pub struct IntoIter<V>(smallvec::IntoIter<[(KeyString, V); 8]>);

impl<V> Iterator for IntoIter<V> {
    type Item = (String, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, v)| (k.into(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_keys_are_case_insensitive() {
        let mut headers = Headers::new();
        headers.append("Foo", "1");
        assert_eq!(&headers["FOO"], "1");
        assert_eq!(&headers["foo"], "1");
        assert_eq!(&headers["bar"], "");
        assert!(headers.contains("fOo"));
    }

    #[test]
    fn data_map_keys_are_exact() {
        let mut data = DataMap::new();
        data.append("Foo", "1");
        assert_eq!(data.get("foo"), None);
        assert_eq!(&data["Foo"], "1");
    }

    #[test]
    fn preserves_insertion_order() {
        let mut headers = Headers::new();
        headers.append("b", "1");
        headers.append("a", "2");
        headers.append("b", "3");
        let entries: Vec<_> = headers.iter().collect();
        assert_eq!(
            entries,
            [
                ("b", &"1".to_string()),
                ("a", &"2".to_string()),
                ("b", &"3".to_string())
            ]
        );
        assert_eq!(headers.count("B"), 2);
    }

    #[test]
    fn remove_erases_all_matching_entries() {
        let mut headers = Headers::new();
        headers.append("a", "1");
        headers.append("A", "2");
        headers.append("b", "3");
        assert_eq!(headers.remove("a"), 2);
        assert_eq!(headers.len(), 1);
        assert!(!headers.contains("a"));
    }

    #[test]
    fn mutable_access_inserts_an_empty_value_when_absent() {
        let mut headers = Headers::new();
        assert_eq!(headers.get_or_insert_mut("a"), "");
        assert_eq!(headers.len(), 1);
        assert_eq!(&headers["a"], "");

        headers.get_or_insert_mut("A").push('1');
        assert_eq!(headers.len(), 1);
        assert_eq!(&headers["a"], "1");

        headers.append("b", "2");
        headers.append("B", "3");
        *headers.get_or_insert_mut("b") = "4".to_string();
        let values: Vec<_> = headers.get_all("b").collect();
        assert_eq!(values, ["4", "3"]);
    }

    #[test]
    fn set_replaces_the_first_entry() {
        let mut headers = Headers::new();
        headers.append("a", "1");
        headers.append("a", "2");
        headers.set("A", "3");
        let values: Vec<_> = headers.get_all("a").collect();
        assert_eq!(values, ["3", "2"]);
    }

    #[test]
    fn equality_is_ordered_and_pairwise() {
        let ab: Headers = [("a", "1"), ("b", "2")].into_iter().collect();
        let upper: Headers = [("A", "1"), ("B", "2")].into_iter().collect();
        let ba: Headers = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(ab, upper);
        assert_ne!(ab, ba);
    }
}
