use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Deref;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use surrealdb::sql::{Id, Thing};

use super::Table;

/// A record id that knows which table it belongs to.
///
/// Deserializing rejects ids from any other table, so a `Record<Project>` can never point into `blog`. The
/// [Default] record gets a random key.
pub struct Record<T> {
    thing: Thing,
    table: PhantomData<T>,
}

impl<T: Table> Record<T> {
    pub fn new(key: impl Into<Id>) -> Self {
        Self::wrap(Thing {
            tb: T::table().to_string(),
            id: key.into(),
        })
    }

    pub fn random() -> Self {
        Self::new(Id::rand())
    }
}

impl<T> Record<T> {
    fn wrap(thing: Thing) -> Self {
        Record {
            thing,
            table: PhantomData,
        }
    }

    /// The key without the table prefix, as used in URLs.
    pub fn key(&self) -> String {
        self.thing.id.to_raw()
    }
}

impl<T: Table> Default for Record<T> {
    fn default() -> Self {
        Self::random()
    }
}

impl<T> AsRef<Thing> for Record<T> {
    fn as_ref(&self) -> &Thing {
        &self.thing
    }
}

impl<T> Deref for Record<T> {
    type Target = Thing;

    fn deref(&self) -> &Thing {
        &self.thing
    }
}

impl<T> Clone for Record<T> {
    fn clone(&self) -> Self {
        Self::wrap(self.thing.clone())
    }
}

impl<T> PartialEq for Record<T> {
    fn eq(&self, other: &Self) -> bool {
        self.thing == other.thing
    }
}

impl<T> Eq for Record<T> {}

impl<T> Hash for Record<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.thing.hash(state);
    }
}

impl<T> fmt::Debug for Record<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.thing, f)
    }
}

impl<T> fmt::Display for Record<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.thing, f)
    }
}

impl<T> Serialize for Record<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.thing.serialize(serializer)
    }
}

impl<'de, T: Table> Deserialize<'de> for Record<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let thing = Thing::deserialize(deserializer)?;

        if thing.tb != T::table() {
            return Err(D::Error::custom(format!(
                "expected a record of `{}`, found one of `{}`",
                T::table(),
                thing.tb
            )));
        }

        Ok(Self::wrap(thing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Note;

    impl Table for Note {
        fn id(&self) -> &Thing {
            unimplemented!()
        }

        fn table() -> &'static str {
            "notes"
        }
    }

    #[test]
    fn keys_drop_the_table_prefix() {
        let record = Record::<Note>::new("abc");
        assert_eq!(record.key(), "abc");
        assert_eq!(record.tb, "notes");
    }

    #[test]
    fn random_records_differ() {
        assert_ne!(Record::<Note>::random(), Record::<Note>::random());
    }

    #[test]
    fn records_of_other_tables_are_rejected() {
        let own = serde_json::to_value(Thing::from(("notes", "a"))).unwrap();
        let other = serde_json::to_value(Thing::from(("blog", "a"))).unwrap();

        assert!(serde_json::from_value::<Record<Note>>(own).is_ok());
        assert!(serde_json::from_value::<Record<Note>>(other).is_err());
    }
}
