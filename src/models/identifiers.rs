use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

macro_rules! impl_id_type {
    ($name:ident) => {
        #[derive(Clone, Debug, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.0 == other.0
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.hash(state);
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_string()))
            }
        }
    };
}

impl_id_type!(CourseId);
impl_id_type!(ModuleId);
impl_id_type!(ContentId);

/// Composite identifier for one trackable content item. Doubles as the
/// durable progress-cache key and as the dedup key for completion.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentKey {
    pub course_id: CourseId,
    pub module_id: ModuleId,
    pub content_id: ContentId,
}

impl ContentKey {
    pub fn new(
        course_id: impl Into<CourseId>,
        module_id: impl Into<ModuleId>,
        content_id: impl Into<ContentId>,
    ) -> Self {
        Self {
            course_id: course_id.into(),
            module_id: module_id.into(),
            content_id: content_id.into(),
        }
    }

    /// Namespaced key for durable storage, kept stable across releases so
    /// resumed sessions find entries written by older builds.
    pub fn storage_key(&self) -> String {
        format!(
            "watch-progress:{}:{}:{}",
            self.course_id, self.module_id, self.content_id
        )
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.course_id, self.module_id, self.content_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_id_type {
        ($name:ident, $ty:ident) => {
            mod $name {
                use super::*;

                #[test]
                fn test_creation_and_conversion() {
                    let id = $ty::new("test_id");
                    assert_eq!(id.as_str(), "test_id");
                    assert_eq!(id.to_string(), "test_id");
                }

                #[test]
                fn test_equality() {
                    let id1 = $ty::new("test_id");
                    let id2 = $ty::new("test_id");
                    let id3 = $ty::new("other_id");

                    assert_eq!(id1, id2);
                    assert_ne!(id1, id3);
                }

                #[test]
                fn test_serde_roundtrip() {
                    let id = $ty::new("test_id");
                    let json = serde_json::to_string(&id).unwrap();
                    assert_eq!(json, "\"test_id\"");
                    let back: $ty = serde_json::from_str(&json).unwrap();
                    assert_eq!(back, id);
                }
            }
        };
    }

    test_id_type!(course_id, CourseId);
    test_id_type!(module_id, ModuleId);
    test_id_type!(content_id, ContentId);

    #[test]
    fn content_key_storage_key_is_namespaced() {
        let key = ContentKey::new("course-1", "module-2", "content-3");
        assert_eq!(
            key.storage_key(),
            "watch-progress:course-1:module-2:content-3"
        );
    }

    #[test]
    fn content_key_display() {
        let key = ContentKey::new("c", "m", "i");
        assert_eq!(key.to_string(), "c/m/i");
    }

    #[test]
    fn content_key_hashes_by_value() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(ContentKey::new("c", "m", "i"));
        assert!(set.contains(&ContentKey::new("c", "m", "i")));
        assert!(!set.contains(&ContentKey::new("c", "m", "other")));
    }
}
