//! Localized entity aggregates.
//!
//! A parent record (page, post, homepage, or a user for bios) owns at most one content
//! record per language. `ContentSet` keys records by language id so the one-per-language
//! rule holds by construction; the Postgres schema backs the same rule with a unique
//! `(parent_id, language_id)` constraint.

use std::collections::{BTreeMap, HashMap, btree_map::Entry};
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// ParentKind
///
/// Names the owner of a content set in error messages and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentKind {
    Page,
    Post,
    Homepage,
    User,
}

impl ParentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParentKind::Page => "page",
            ParentKind::Post => "post",
            ParentKind::Homepage => "homepage",
            ParentKind::User => "user",
        }
    }

    /// Capitalised entity name, as used in `"Page not found with id: ..."`.
    pub fn label(&self) -> &'static str {
        match self {
            ParentKind::Page => "Page",
            ParentKind::Post => "Post",
            ParentKind::Homepage => "Homepage",
            ParentKind::User => "User",
        }
    }
}

impl fmt::Display for ParentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-language record owned by exactly one parent.
///
/// `parent_id` and `language_id` are fixed at creation; only the text fields and
/// `updated_at` change afterwards.
pub trait LocalizedRecord {
    fn id(&self) -> Uuid;
    fn parent_id(&self) -> Uuid;
    fn language_id(&self) -> Uuid;
    fn updated_at(&self) -> DateTime<Utc>;
    fn set_updated_at(&mut self, at: DateTime<Utc>);
}

/// Request payload that can create a record of type `R` or overwrite its text fields.
pub trait ContentPayload<R: LocalizedRecord> {
    fn into_record(self, parent_id: Uuid, language_id: Uuid, now: DateTime<Utc>) -> R;

    /// Replace the mutable text fields of `record`. Must not touch identity, parent or language.
    fn apply_to(self, record: &mut R);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("content already exists for language {0}")]
    DuplicateLanguage(Uuid),
    #[error("content not found for language {0}")]
    MissingLanguage(Uuid),
}

/// ContentSet
///
/// The content records of one parent, keyed by language id. Iteration order is ascending
/// language id, which is also the order responses expose.
#[derive(Debug, Clone)]
pub struct ContentSet<R> {
    by_language: BTreeMap<Uuid, R>,
}

impl<R> Default for ContentSet<R> {
    fn default() -> Self {
        Self {
            by_language: BTreeMap::new(),
        }
    }
}

impl<R: LocalizedRecord> ContentSet<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from stored rows, rejecting a second row for the same language.
    pub fn from_records(records: impl IntoIterator<Item = R>) -> Result<Self, ContentError> {
        let mut set = Self::new();
        for record in records {
            match set.by_language.entry(record.language_id()) {
                Entry::Occupied(slot) => return Err(ContentError::DuplicateLanguage(*slot.key())),
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
            }
        }
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.by_language.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_language.is_empty()
    }

    pub fn contains(&self, language_id: Uuid) -> bool {
        self.by_language.contains_key(&language_id)
    }

    pub fn get(&self, language_id: Uuid) -> Option<&R> {
        self.by_language.get(&language_id)
    }

    pub fn language_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.by_language.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> + '_ {
        self.by_language.values()
    }

    /// Creates the record for `language_id`. Fails if the language is already present.
    pub fn attach<P>(
        &mut self,
        parent_id: Uuid,
        language_id: Uuid,
        payload: P,
        now: DateTime<Utc>,
    ) -> Result<&R, ContentError>
    where
        P: ContentPayload<R>,
    {
        match self.by_language.entry(language_id) {
            Entry::Occupied(_) => Err(ContentError::DuplicateLanguage(language_id)),
            Entry::Vacant(slot) => Ok(slot.insert(payload.into_record(parent_id, language_id, now))),
        }
    }

    /// Overwrites the text fields of an existing record and advances its `updated_at`.
    pub fn update<P>(
        &mut self,
        language_id: Uuid,
        payload: P,
        now: DateTime<Utc>,
    ) -> Result<&R, ContentError>
    where
        P: ContentPayload<R>,
    {
        let record = self
            .by_language
            .get_mut(&language_id)
            .ok_or(ContentError::MissingLanguage(language_id))?;
        payload.apply_to(record);
        let stamp = next_update_stamp(record.updated_at(), now);
        record.set_updated_at(stamp);
        Ok(record)
    }

    pub fn remove(&mut self, language_id: Uuid) -> Result<R, ContentError> {
        self.by_language
            .remove(&language_id)
            .ok_or(ContentError::MissingLanguage(language_id))
    }

    pub fn into_vec(self) -> Vec<R> {
        self.by_language.into_values().collect()
    }
}

impl<R: LocalizedRecord + Clone> ContentSet<R> {
    pub fn to_vec(&self) -> Vec<R> {
        self.by_language.values().cloned().collect()
    }
}

/// Returns a timestamp strictly after `previous`, preferring `now` when the clock has
/// moved forward.
pub fn next_update_stamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::microseconds(1);
    if now > floor { now } else { floor }
}

/// A parent entity that can be projected together with its content set.
pub trait AggregateRoot {
    type Content: LocalizedRecord + Clone + fmt::Debug;
    type Response;

    const KIND: ParentKind;

    fn id(&self) -> Uuid;

    /// Parent fields plus `contents`, which arrive sorted by language id.
    fn assemble(self, contents: Vec<Self::Content>) -> Self::Response;
}

/// Localized
///
/// The aggregate itself: a parent and the content records it owns.
#[derive(Debug, Clone)]
pub struct Localized<P: AggregateRoot> {
    pub parent: P,
    pub contents: ContentSet<P::Content>,
}

impl<P: AggregateRoot> Localized<P> {
    /// A freshly created parent owns no content.
    pub fn new(parent: P) -> Self {
        Self {
            parent,
            contents: ContentSet::new(),
        }
    }

    pub fn with_contents(parent: P, contents: ContentSet<P::Content>) -> Self {
        Self { parent, contents }
    }

    pub fn into_response(self) -> P::Response {
        self.parent.assemble(self.contents.into_vec())
    }
}

impl<P: AggregateRoot + Clone> Localized<P> {
    /// Read-only projection; leaves the aggregate untouched.
    pub fn assemble_response(&self) -> P::Response {
        self.parent.clone().assemble(self.contents.to_vec())
    }
}

/// Groups `contents` under their parents and assembles one response per parent, keeping
/// the order of `parents`.
pub fn assemble_all<P: AggregateRoot>(
    parents: Vec<P>,
    contents: Vec<P::Content>,
) -> Result<Vec<P::Response>, ContentError> {
    let mut grouped: HashMap<Uuid, Vec<P::Content>> = HashMap::new();
    for record in contents {
        grouped.entry(record.parent_id()).or_default().push(record);
    }

    parents
        .into_iter()
        .map(|parent| {
            let records = grouped.remove(&parent.id()).unwrap_or_default();
            let set = ContentSet::from_records(records)?;
            Ok(Localized::with_contents(parent, set).into_response())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: Uuid,
        owner: Uuid,
        language: Uuid,
        text: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    impl LocalizedRecord for Note {
        fn id(&self) -> Uuid {
            self.id
        }
        fn parent_id(&self) -> Uuid {
            self.owner
        }
        fn language_id(&self) -> Uuid {
            self.language
        }
        fn updated_at(&self) -> DateTime<Utc> {
            self.updated_at
        }
        fn set_updated_at(&mut self, at: DateTime<Utc>) {
            self.updated_at = at;
        }
    }

    struct NoteText(&'static str);

    impl ContentPayload<Note> for NoteText {
        fn into_record(self, parent_id: Uuid, language_id: Uuid, now: DateTime<Utc>) -> Note {
            Note {
                id: Uuid::new_v4(),
                owner: parent_id,
                language: language_id,
                text: self.0.to_string(),
                created_at: now,
                updated_at: now,
            }
        }
        fn apply_to(self, record: &mut Note) {
            record.text = self.0.to_string();
        }
    }

    #[derive(Debug, Clone)]
    struct Board {
        id: Uuid,
    }

    impl AggregateRoot for Board {
        type Content = Note;
        type Response = (Uuid, Vec<Uuid>);
        const KIND: ParentKind = ParentKind::Page;

        fn id(&self) -> Uuid {
            self.id
        }
        fn assemble(self, contents: Vec<Note>) -> Self::Response {
            (self.id, contents.iter().map(|n| n.language).collect())
        }
    }

    #[test]
    fn attach_twice_for_same_language_conflicts() {
        let parent = Uuid::new_v4();
        let en = Uuid::new_v4();
        let mut set = ContentSet::new();

        let created = set.attach(parent, en, NoteText("Hello"), Utc::now()).unwrap();
        assert_eq!(created.text, "Hello");
        assert_eq!(created.created_at, created.updated_at);

        let err = set.attach(parent, en, NoteText("Again"), Utc::now()).unwrap_err();
        assert_eq!(err, ContentError::DuplicateLanguage(en));
        assert_eq!(set.get(en).unwrap().text, "Hello");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn update_keeps_keys_and_advances_timestamp() {
        let parent = Uuid::new_v4();
        let en = Uuid::new_v4();
        let now = Utc::now();
        let mut set = ContentSet::new();
        let original = set.attach(parent, en, NoteText("Hello"), now).unwrap().clone();

        // Same wall-clock reading: the stamp must still move forward.
        let updated = set.update(en, NoteText("Changed"), now).unwrap();
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.owner, parent);
        assert_eq!(updated.language, en);
        assert_eq!(updated.text, "Changed");
        assert!(updated.updated_at > original.updated_at);
        assert_eq!(updated.created_at, original.created_at);
    }

    #[test]
    fn update_missing_language_fails() {
        let mut set: ContentSet<Note> = ContentSet::new();
        let fr = Uuid::new_v4();
        assert_eq!(
            set.update(fr, NoteText("x"), Utc::now()).unwrap_err(),
            ContentError::MissingLanguage(fr)
        );
    }

    #[test]
    fn second_remove_is_missing() {
        let parent = Uuid::new_v4();
        let en = Uuid::new_v4();
        let mut set = ContentSet::new();
        set.attach(parent, en, NoteText("Hello"), Utc::now()).unwrap();

        assert!(set.remove(en).is_ok());
        assert_eq!(set.remove(en).unwrap_err(), ContentError::MissingLanguage(en));
        assert!(set.is_empty());
    }

    #[test]
    fn response_lists_attached_minus_removed_in_language_order() {
        let board = Board { id: Uuid::new_v4() };
        let mut aggregate = Localized::new(board.clone());
        let mut languages: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for language in &languages {
            aggregate
                .contents
                .attach(board.id, *language, NoteText("t"), Utc::now())
                .unwrap();
        }
        let removed = languages.remove(1);
        aggregate.contents.remove(removed).unwrap();
        languages.sort();

        let (id, listed) = aggregate.assemble_response();
        assert_eq!(id, board.id);
        assert_eq!(listed, languages);
        // Pure read: a second projection is identical.
        assert_eq!(aggregate.assemble_response().1, languages);
    }

    #[test]
    fn from_records_rejects_duplicate_rows() {
        let parent = Uuid::new_v4();
        let en = Uuid::new_v4();
        let now = Utc::now();
        let a = NoteText("a").into_record(parent, en, now);
        let b = NoteText("b").into_record(parent, en, now);

        assert_eq!(
            ContentSet::from_records(vec![a, b]).unwrap_err(),
            ContentError::DuplicateLanguage(en)
        );
    }

    #[test]
    fn assemble_all_groups_by_parent() {
        let first = Board { id: Uuid::new_v4() };
        let second = Board { id: Uuid::new_v4() };
        let en = Uuid::new_v4();
        let now = Utc::now();
        let notes = vec![
            NoteText("a").into_record(second.id, en, now),
            NoteText("b").into_record(first.id, en, now),
        ];

        let responses = assemble_all(vec![first.clone(), second.clone()], notes).unwrap();
        assert_eq!(responses[0], (first.id, vec![en]));
        assert_eq!(responses[1], (second.id, vec![en]));
    }

    #[test]
    fn next_update_stamp_is_strictly_increasing() {
        let now = Utc::now();
        assert_eq!(next_update_stamp(now, now), now + Duration::microseconds(1));

        let later = now + Duration::seconds(5);
        assert_eq!(next_update_stamp(now, later), later);

        let earlier = now - Duration::seconds(5);
        assert!(next_update_stamp(now, earlier) > now);
    }
}
