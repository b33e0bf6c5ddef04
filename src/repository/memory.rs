use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Repository;
use crate::error::{ApiError, AppResult};
use crate::localized::{
    AggregateRoot, ContentError, ContentPayload, ContentSet, Localized, ParentKind,
    next_update_stamp,
};
use crate::models::role::{ROLE_USER, SEEDED_ROLES};
use crate::models::{
    ArticleFields, ArticleMeta, Author, BioFields, Comment, CommentTarget, GlobalSettings,
    Homepage, HomepageContent, HomepageFields, HomepageRequest, HomepageResponse, Language,
    LanguageRequest, Link, LinkFields, LinkScope, NewUser, Page, PageContent, PageResponse, Post,
    PostContent, PostResponse, Role, RoleRequest, SettingsChanges, User, UserBio, UserChanges,
    UserResponse,
};

/// InMemoryRepository
///
/// A `Repository` held entirely in process memory behind one `RwLock`. Every trait method
/// takes the lock once, so each call is atomic with respect to the others. Content sets are
/// `ContentSet`s, which makes a second record for the same language unrepresentable.
///
/// Used by the test suite and for running the API without a database.
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    /// Creates an empty store holding only the seeded roles.
    pub fn new() -> Self {
        let mut store = Store::default();
        for name in SEEDED_ROLES {
            let now = store.tick();
            let role = Role {
                id: Uuid::new_v4(),
                name: name.to_string(),
                created_at: now,
                updated_at: now,
            };
            store.roles.insert(role.id, role);
        }
        Self {
            store: RwLock::new(store),
        }
    }
}

struct StoredUser {
    user: User,
    roles: BTreeSet<Uuid>,
}

#[derive(Default)]
struct Store {
    last_stamp: Option<DateTime<Utc>>,
    languages: HashMap<Uuid, Language>,
    links: HashMap<Uuid, Link>,
    roles: HashMap<Uuid, Role>,
    users: HashMap<Uuid, StoredUser>,
    bios: HashMap<Uuid, ContentSet<UserBio>>,
    pages: HashMap<Uuid, Localized<Page>>,
    posts: HashMap<Uuid, Localized<Post>>,
    homepages: HashMap<Uuid, Localized<Homepage>>,
    page_authors: HashMap<Uuid, BTreeSet<Uuid>>,
    post_authors: HashMap<Uuid, BTreeSet<Uuid>>,
    comments: HashMap<Uuid, Comment>,
    settings: Option<GlobalSettings>,
}

impl Store {
    /// Wall-clock time, nudged forward so that no two writes share a timestamp.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(previous) => next_update_stamp(previous, now),
            None => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn language(&self, id: Uuid) -> AppResult<&Language> {
        self.languages
            .get(&id)
            .ok_or_else(|| ApiError::not_found("Language", id))
    }

    fn ensure_link(&self, link_id: Option<Uuid>) -> AppResult<()> {
        match link_id {
            Some(id) if !self.links.contains_key(&id) => Err(ApiError::not_found("Link", id)),
            _ => Ok(()),
        }
    }

    fn language_in_use(&self, id: Uuid) -> bool {
        self.pages.values().any(|p| p.contents.contains(id))
            || self.posts.values().any(|p| p.contents.contains(id))
            || self.homepages.values().any(|h| h.contents.contains(id))
            || self.bios.values().any(|b| b.contains(id))
    }

    fn stored_user(&self, id: Uuid) -> AppResult<&StoredUser> {
        self.users
            .get(&id)
            .ok_or_else(|| ApiError::not_found("User", id))
    }

    fn user_response(&self, stored: &StoredUser) -> UserResponse {
        let mut roles: Vec<String> = stored
            .roles
            .iter()
            .filter_map(|id| self.roles.get(id).map(|r| r.name.clone()))
            .collect();
        roles.sort();
        stored.user.clone().into_response(roles)
    }

    fn ensure_unique_user(&self, skip: Option<Uuid>, username: &str, email: &str) -> AppResult<()> {
        for stored in self.users.values().filter(|s| Some(s.user.id) != skip) {
            if stored.user.username == username {
                return Err(ApiError::Conflict(format!("Username {username} is already taken")));
            }
            if stored.user.email == email {
                return Err(ApiError::Conflict(format!("Email {email} is already registered")));
            }
        }
        Ok(())
    }

    /// Refreshes the profile snapshot taken when the comment was written.
    fn with_author(&self, mut comment: Comment) -> Comment {
        if let Some(stored) = self.users.get(&comment.author.id) {
            comment.author = stored.user.author();
        }
        comment
    }

    fn author_profiles(&self, ids: Option<&BTreeSet<Uuid>>) -> Vec<Author> {
        let mut authors: Vec<Author> = ids
            .into_iter()
            .flatten()
            .filter_map(|id| self.users.get(id).map(|s| s.user.author()))
            .collect();
        authors.sort_by(|a, b| a.username.cmp(&b.username));
        authors
    }

    fn global_comments_enabled(&self) -> bool {
        self.settings.as_ref().is_none_or(|s| s.global_comments_enabled)
    }

    fn sorted_comments(&self, filter: impl Fn(&Comment) -> bool) -> Vec<Comment> {
        let mut comments: Vec<Comment> = self
            .comments
            .values()
            .filter(|&c| filter(c))
            .cloned()
            .map(|c| self.with_author(c))
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments
    }

    /// Returns whether comments are enabled on the target, or NotFound if it does not exist.
    fn comments_enabled(&self, target: CommentTarget) -> AppResult<bool> {
        match target {
            CommentTarget::Post(id) => self
                .posts
                .get(&id)
                .map(|p| p.parent.comments_enabled)
                .ok_or_else(|| ApiError::not_found("Post", id)),
            CommentTarget::Page(id) => self
                .pages
                .get(&id)
                .map(|p| p.parent.comments_enabled)
                .ok_or_else(|| ApiError::not_found("Page", id)),
        }
    }
}

/// Gives the generic content helpers access to the map holding one aggregate kind.
trait Table: AggregateRoot + Clone + Sized {
    fn table(store: &Store) -> &HashMap<Uuid, Localized<Self>>;
    fn table_mut(store: &mut Store) -> &mut HashMap<Uuid, Localized<Self>>;
    fn created_at(&self) -> DateTime<Utc>;
}

impl Table for Page {
    fn table(store: &Store) -> &HashMap<Uuid, Localized<Self>> {
        &store.pages
    }
    fn table_mut(store: &mut Store) -> &mut HashMap<Uuid, Localized<Self>> {
        &mut store.pages
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Table for Post {
    fn table(store: &Store) -> &HashMap<Uuid, Localized<Self>> {
        &store.posts
    }
    fn table_mut(store: &mut Store) -> &mut HashMap<Uuid, Localized<Self>> {
        &mut store.posts
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Table for Homepage {
    fn table(store: &Store) -> &HashMap<Uuid, Localized<Self>> {
        &store.homepages
    }
    fn table_mut(store: &mut Store) -> &mut HashMap<Uuid, Localized<Self>> {
        &mut store.homepages
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Pages and posts, which credit users as authors.
trait Authored: Table {
    fn published(&self) -> bool;
    fn authors(store: &Store) -> &HashMap<Uuid, BTreeSet<Uuid>>;
    fn authors_mut(store: &mut Store) -> &mut HashMap<Uuid, BTreeSet<Uuid>>;
}

impl Authored for Page {
    fn published(&self) -> bool {
        self.published
    }
    fn authors(store: &Store) -> &HashMap<Uuid, BTreeSet<Uuid>> {
        &store.page_authors
    }
    fn authors_mut(store: &mut Store) -> &mut HashMap<Uuid, BTreeSet<Uuid>> {
        &mut store.page_authors
    }
}

impl Authored for Post {
    fn published(&self) -> bool {
        self.published
    }
    fn authors(store: &Store) -> &HashMap<Uuid, BTreeSet<Uuid>> {
        &store.post_authors
    }
    fn authors_mut(store: &mut Store) -> &mut HashMap<Uuid, BTreeSet<Uuid>> {
        &mut store.post_authors
    }
}

fn find<P: Table>(store: &Store, id: Uuid) -> AppResult<&Localized<P>> {
    P::table(store)
        .get(&id)
        .ok_or_else(|| ApiError::not_found(P::KIND.label(), id))
}

fn find_mut<P: Table>(store: &mut Store, id: Uuid) -> AppResult<&mut Localized<P>> {
    P::table_mut(store)
        .get_mut(&id)
        .ok_or_else(|| ApiError::not_found(P::KIND.label(), id))
}

/// Newest first, like the Postgres listing.
fn list_aggregates<P: Table>(store: &Store, keep: impl Fn(&P) -> bool) -> Vec<P::Response> {
    let mut aggregates: Vec<&Localized<P>> =
        P::table(store).values().filter(|a| keep(&a.parent)).collect();
    aggregates.sort_by(|a, b| b.parent.created_at().cmp(&a.parent.created_at()));
    aggregates.into_iter().map(|a| a.assemble_response()).collect()
}

fn get_content<P: Table>(store: &Store, parent_id: Uuid, language_id: Uuid) -> AppResult<P::Content> {
    find::<P>(store, parent_id)?
        .contents
        .get(language_id)
        .cloned()
        .ok_or_else(|| ApiError::missing_content(P::KIND, parent_id, language_id))
}

fn attach_content<P, Q>(store: &mut Store, parent_id: Uuid, language_id: Uuid, payload: Q) -> AppResult<P::Content>
where
    P: Table,
    Q: ContentPayload<P::Content>,
{
    find::<P>(store, parent_id)?;
    let abbreviation = store.language(language_id)?.abbreviation.clone();
    let now = store.tick();

    let aggregate = find_mut::<P>(store, parent_id)?;
    match aggregate.contents.attach(parent_id, language_id, payload, now) {
        Ok(record) => Ok(record.clone()),
        Err(ContentError::DuplicateLanguage(_)) => Err(ApiError::duplicate_content(
            P::KIND,
            parent_id,
            &abbreviation,
            language_id,
        )),
        Err(e) => Err(e.into()),
    }
}

fn update_content<P, Q>(store: &mut Store, parent_id: Uuid, language_id: Uuid, payload: Q) -> AppResult<P::Content>
where
    P: Table,
    Q: ContentPayload<P::Content>,
{
    let now = store.tick();
    let aggregate = find_mut::<P>(store, parent_id)?;
    aggregate
        .contents
        .update(language_id, payload, now)
        .map(|record| record.clone())
        .map_err(|_| ApiError::missing_content(P::KIND, parent_id, language_id))
}

fn remove_content<P: Table>(store: &mut Store, parent_id: Uuid, language_id: Uuid) -> AppResult<()> {
    let aggregate = find_mut::<P>(store, parent_id)?;
    aggregate
        .contents
        .remove(language_id)
        .map(|_| ())
        .map_err(|_| ApiError::missing_content(P::KIND, parent_id, language_id))
}

fn list_authors<P: Authored>(store: &Store, parent_id: Uuid) -> AppResult<Vec<Author>> {
    find::<P>(store, parent_id)?;
    Ok(store.author_profiles(P::authors(store).get(&parent_id)))
}

fn list_by_author<P: Authored>(store: &Store, user_id: Uuid, published_only: bool) -> AppResult<Vec<P::Response>> {
    store.stored_user(user_id)?;
    let authored = P::authors(store);
    Ok(list_aggregates::<P>(store, |p| {
        (!published_only || p.published())
            && authored.get(&p.id()).is_some_and(|users| users.contains(&user_id))
    }))
}

fn assign_author<P: Authored>(store: &mut Store, parent_id: Uuid, user_id: Uuid) -> AppResult<Vec<Author>> {
    find::<P>(store, parent_id)?;
    store.stored_user(user_id)?;
    P::authors_mut(store).entry(parent_id).or_default().insert(user_id);
    Ok(store.author_profiles(P::authors(store).get(&parent_id)))
}

fn remove_author<P: Authored>(store: &mut Store, parent_id: Uuid, user_id: Uuid) -> AppResult<()> {
    find::<P>(store, parent_id)?;
    let removed = P::authors_mut(store)
        .get_mut(&parent_id)
        .is_some_and(|users| users.remove(&user_id));
    if !removed {
        return Err(ApiError::NotFound(format!(
            "User {user_id} is not an author of {} {parent_id}",
            P::KIND.as_str()
        )));
    }
    Ok(())
}

fn insert_meta<P, F>(store: &mut Store, meta: ArticleMeta, build: F) -> AppResult<P::Response>
where
    P: Table,
    F: FnOnce(Uuid, ArticleMeta, DateTime<Utc>) -> P,
{
    store.ensure_link(meta.link_id)?;
    let now = store.tick();
    let aggregate = Localized::new(build(Uuid::new_v4(), meta, now));
    let response = aggregate.assemble_response();
    P::table_mut(store).insert(aggregate.parent.id(), aggregate);
    Ok(response)
}

fn bios_of(store: &Store, user_id: Uuid) -> AppResult<Option<&ContentSet<UserBio>>> {
    store.stored_user(user_id)?;
    Ok(store.bios.get(&user_id))
}

#[async_trait]
impl Repository for InMemoryRepository {
    // --- Languages ---

    async fn list_languages(&self) -> AppResult<Vec<Language>> {
        let store = self.store.read().await;
        let mut languages: Vec<Language> = store.languages.values().cloned().collect();
        languages.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.abbreviation.cmp(&b.abbreviation)));
        Ok(languages)
    }

    async fn get_language(&self, id: Uuid) -> AppResult<Language> {
        self.store.read().await.language(id).cloned()
    }

    async fn create_language(&self, req: LanguageRequest) -> AppResult<Language> {
        let mut store = self.store.write().await;
        if store.languages.values().any(|l| l.abbreviation == req.abbreviation) {
            return Err(ApiError::Conflict(format!(
                "Language with abbreviation {} already exists",
                req.abbreviation
            )));
        }
        let language = Language {
            id: Uuid::new_v4(),
            name: req.name,
            abbreviation: req.abbreviation,
            font_awesome_icon: req.font_awesome_icon,
            mdi_icon: req.mdi_icon,
        };
        store.languages.insert(language.id, language.clone());
        Ok(language)
    }

    async fn update_language(&self, id: Uuid, req: LanguageRequest) -> AppResult<Language> {
        let mut store = self.store.write().await;
        store.language(id)?;
        if store
            .languages
            .values()
            .any(|l| l.id != id && l.abbreviation == req.abbreviation)
        {
            return Err(ApiError::Conflict(format!(
                "Language with abbreviation {} already exists",
                req.abbreviation
            )));
        }
        let language = Language {
            id,
            name: req.name,
            abbreviation: req.abbreviation,
            font_awesome_icon: req.font_awesome_icon,
            mdi_icon: req.mdi_icon,
        };
        store.languages.insert(id, language.clone());
        Ok(language)
    }

    async fn delete_language(&self, id: Uuid) -> AppResult<()> {
        let mut store = self.store.write().await;
        let abbreviation = store.language(id)?.abbreviation.clone();
        if store.language_in_use(id) {
            return Err(ApiError::Conflict(format!(
                "Language {abbreviation} is still used by content or bios"
            )));
        }
        store.languages.remove(&id);
        Ok(())
    }

    // --- Links ---

    async fn list_links(&self, scope: Option<LinkScope>) -> AppResult<Vec<Link>> {
        let store = self.store.read().await;
        let mut links: Vec<Link> = store
            .links
            .values()
            .filter(|l| scope.is_none_or(|s| l.scope == s))
            .cloned()
            .collect();
        links.sort_by(|a, b| a.url.cmp(&b.url).then_with(|| a.id.cmp(&b.id)));
        Ok(links)
    }

    async fn get_link(&self, id: Uuid) -> AppResult<Link> {
        self.store
            .read()
            .await
            .links
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Link", id))
    }

    async fn create_link(&self, fields: LinkFields) -> AppResult<Link> {
        let mut store = self.store.write().await;
        let link = Link {
            id: Uuid::new_v4(),
            url: fields.url,
            name: fields.name,
            font_awesome_icon: fields.font_awesome_icon,
            mdi_icon: fields.mdi_icon,
            link_type: fields.link_type,
            scope: fields.scope,
        };
        store.links.insert(link.id, link.clone());
        Ok(link)
    }

    async fn update_link(&self, id: Uuid, fields: LinkFields) -> AppResult<Link> {
        let mut store = self.store.write().await;
        let link = store
            .links
            .get_mut(&id)
            .ok_or_else(|| ApiError::not_found("Link", id))?;
        link.url = fields.url;
        link.name = fields.name;
        link.font_awesome_icon = fields.font_awesome_icon;
        link.mdi_icon = fields.mdi_icon;
        link.link_type = fields.link_type;
        link.scope = fields.scope;
        Ok(link.clone())
    }

    async fn delete_link(&self, id: Uuid) -> AppResult<()> {
        let mut store = self.store.write().await;
        if store.links.remove(&id).is_none() {
            return Err(ApiError::not_found("Link", id));
        }
        let cleared = Some(id);
        for page in store.pages.values_mut().filter(|p| p.parent.link_id == cleared) {
            page.parent.link_id = None;
        }
        for post in store.posts.values_mut().filter(|p| p.parent.link_id == cleared) {
            post.parent.link_id = None;
        }
        for homepage in store.homepages.values_mut().filter(|h| h.parent.link_id == cleared) {
            homepage.parent.link_id = None;
        }
        Ok(())
    }

    // --- Roles ---

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let store = self.store.read().await;
        let mut roles: Vec<Role> = store.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn get_role(&self, id: Uuid) -> AppResult<Role> {
        self.store
            .read()
            .await
            .roles
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Role", id))
    }

    async fn get_role_by_name(&self, name: &str) -> AppResult<Role> {
        self.store
            .read()
            .await
            .roles
            .values()
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Role not found with name: {name}")))
    }

    async fn create_role(&self, req: RoleRequest) -> AppResult<Role> {
        let mut store = self.store.write().await;
        if store.roles.values().any(|r| r.name == req.name) {
            return Err(ApiError::Conflict(format!("Role {} already exists", req.name)));
        }
        let now = store.tick();
        let role = Role {
            id: Uuid::new_v4(),
            name: req.name,
            created_at: now,
            updated_at: now,
        };
        store.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn update_role(&self, id: Uuid, req: RoleRequest) -> AppResult<Role> {
        let mut store = self.store.write().await;
        if store.roles.values().any(|r| r.id != id && r.name == req.name) {
            return Err(ApiError::Conflict(format!("Role {} already exists", req.name)));
        }
        let now = store.tick();
        let role = store
            .roles
            .get_mut(&id)
            .ok_or_else(|| ApiError::not_found("Role", id))?;
        role.name = req.name;
        role.updated_at = next_update_stamp(role.updated_at, now);
        Ok(role.clone())
    }

    async fn delete_role(&self, id: Uuid) -> AppResult<()> {
        let mut store = self.store.write().await;
        if store.roles.remove(&id).is_none() {
            return Err(ApiError::not_found("Role", id));
        }
        for stored in store.users.values_mut() {
            stored.roles.remove(&id);
        }
        Ok(())
    }

    // --- Users ---

    async fn list_users(&self) -> AppResult<Vec<UserResponse>> {
        let store = self.store.read().await;
        let mut users: Vec<UserResponse> = store.users.values().map(|s| store.user_response(s)).collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<UserResponse> {
        let store = self.store.read().await;
        let stored = store.stored_user(id)?;
        Ok(store.user_response(stored))
    }

    async fn count_users(&self) -> AppResult<i64> {
        Ok(self.store.read().await.users.len() as i64)
    }

    async fn create_user(&self, user: NewUser) -> AppResult<UserResponse> {
        let mut store = self.store.write().await;
        store.ensure_unique_user(None, &user.username, &user.email)?;
        let default_role = store
            .roles
            .values()
            .find(|r| r.name == ROLE_USER)
            .map(|r| r.id)
            .ok_or_else(|| ApiError::Internal(format!("default role {ROLE_USER} is missing")))?;

        let now = store.tick();
        let stored = StoredUser {
            user: User {
                id: Uuid::new_v4(),
                username: user.username,
                email: user.email,
                password_hash: user.password_hash,
                first_name: user.first_name,
                last_name: user.last_name,
                title: user.title,
                affiliation: user.affiliation,
                thumbnail: user.thumbnail,
                created_at: now,
                updated_at: now,
            },
            roles: BTreeSet::from([default_role]),
        };
        let response = store.user_response(&stored);
        store.users.insert(stored.user.id, stored);
        Ok(response)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> AppResult<UserResponse> {
        let mut store = self.store.write().await;
        let current = &store.stored_user(id)?.user;
        let username = changes.username.clone().unwrap_or_else(|| current.username.clone());
        let email = changes.email.clone().unwrap_or_else(|| current.email.clone());
        store.ensure_unique_user(Some(id), &username, &email)?;

        let now = store.tick();
        let stored = store
            .users
            .get_mut(&id)
            .ok_or_else(|| ApiError::not_found("User", id))?;
        changes.apply_to(&mut stored.user);
        stored.user.updated_at = next_update_stamp(stored.user.updated_at, now);

        let stored = store.stored_user(id)?;
        Ok(store.user_response(stored))
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<()> {
        let mut store = self.store.write().await;
        if store.users.remove(&id).is_none() {
            return Err(ApiError::not_found("User", id));
        }
        store.bios.remove(&id);
        store.comments.retain(|_, c| c.author.id != id);
        for authors in store.page_authors.values_mut() {
            authors.remove(&id);
        }
        for authors in store.post_authors.values_mut() {
            authors.remove(&id);
        }
        Ok(())
    }

    async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> AppResult<UserResponse> {
        let mut store = self.store.write().await;
        if !store.roles.contains_key(&role_id) {
            return Err(ApiError::not_found("Role", role_id));
        }
        let stored = store
            .users
            .get_mut(&user_id)
            .ok_or_else(|| ApiError::not_found("User", user_id))?;
        stored.roles.insert(role_id);

        let stored = store.stored_user(user_id)?;
        Ok(store.user_response(stored))
    }

    async fn revoke_role(&self, user_id: Uuid, role_id: Uuid) -> AppResult<UserResponse> {
        let mut store = self.store.write().await;
        if !store.roles.contains_key(&role_id) {
            return Err(ApiError::not_found("Role", role_id));
        }
        let stored = store
            .users
            .get_mut(&user_id)
            .ok_or_else(|| ApiError::not_found("User", user_id))?;
        stored.roles.remove(&role_id);

        let stored = store.stored_user(user_id)?;
        Ok(store.user_response(stored))
    }

    // --- User bios ---

    async fn list_bios(&self, user_id: Uuid) -> AppResult<Vec<UserBio>> {
        let store = self.store.read().await;
        Ok(bios_of(&store, user_id)?.map(|set| set.to_vec()).unwrap_or_default())
    }

    async fn get_bio(&self, user_id: Uuid, language_id: Uuid) -> AppResult<UserBio> {
        let store = self.store.read().await;
        bios_of(&store, user_id)?
            .and_then(|set| set.get(language_id).cloned())
            .ok_or_else(|| ApiError::missing_content(ParentKind::User, user_id, language_id))
    }

    async fn create_bio(&self, user_id: Uuid, language_id: Uuid, fields: BioFields) -> AppResult<UserBio> {
        let mut store = self.store.write().await;
        store.stored_user(user_id)?;
        let abbreviation = store.language(language_id)?.abbreviation.clone();
        let now = store.tick();

        let set = store.bios.entry(user_id).or_default();
        match set.attach(user_id, language_id, fields, now) {
            Ok(bio) => Ok(bio.clone()),
            Err(ContentError::DuplicateLanguage(_)) => Err(ApiError::duplicate_content(
                ParentKind::User,
                user_id,
                &abbreviation,
                language_id,
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_bio(&self, user_id: Uuid, language_id: Uuid, fields: BioFields) -> AppResult<UserBio> {
        let mut store = self.store.write().await;
        store.stored_user(user_id)?;
        let now = store.tick();
        store
            .bios
            .get_mut(&user_id)
            .ok_or(ContentError::MissingLanguage(language_id))
            .and_then(|set| set.update(language_id, fields, now).map(|bio| bio.clone()))
            .map_err(|_| ApiError::missing_content(ParentKind::User, user_id, language_id))
    }

    async fn delete_bio(&self, user_id: Uuid, language_id: Uuid) -> AppResult<()> {
        let mut store = self.store.write().await;
        store.stored_user(user_id)?;
        store
            .bios
            .get_mut(&user_id)
            .ok_or(ContentError::MissingLanguage(language_id))
            .and_then(|set| set.remove(language_id))
            .map(|_| ())
            .map_err(|_| ApiError::missing_content(ParentKind::User, user_id, language_id))
    }

    // --- Pages ---

    async fn list_pages(&self, published_only: bool) -> AppResult<Vec<PageResponse>> {
        let store = self.store.read().await;
        Ok(list_aggregates::<Page>(&store, |p| !published_only || p.published))
    }

    async fn get_page(&self, id: Uuid) -> AppResult<PageResponse> {
        let store = self.store.read().await;
        Ok(find::<Page>(&store, id)?.assemble_response())
    }

    async fn create_page(&self, meta: ArticleMeta) -> AppResult<PageResponse> {
        let mut store = self.store.write().await;
        insert_meta::<Page, _>(&mut store, meta, |id, meta, now| Page {
            id,
            link_id: meta.link_id,
            thumbnail: meta.thumbnail,
            comments_enabled: meta.comments_enabled,
            published: meta.published,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update_page(&self, id: Uuid, meta: ArticleMeta) -> AppResult<PageResponse> {
        let mut store = self.store.write().await;
        store.ensure_link(meta.link_id)?;
        let now = store.tick();
        let aggregate = find_mut::<Page>(&mut store, id)?;
        let page = &mut aggregate.parent;
        page.link_id = meta.link_id;
        page.thumbnail = meta.thumbnail;
        page.comments_enabled = meta.comments_enabled;
        page.published = meta.published;
        page.updated_at = next_update_stamp(page.updated_at, now);
        Ok(aggregate.assemble_response())
    }

    async fn set_page_published(&self, id: Uuid, published: bool) -> AppResult<PageResponse> {
        let mut store = self.store.write().await;
        let now = store.tick();
        let aggregate = find_mut::<Page>(&mut store, id)?;
        aggregate.parent.published = published;
        aggregate.parent.updated_at = next_update_stamp(aggregate.parent.updated_at, now);
        Ok(aggregate.assemble_response())
    }

    async fn delete_page(&self, id: Uuid) -> AppResult<()> {
        let mut store = self.store.write().await;
        if store.pages.remove(&id).is_none() {
            return Err(ApiError::not_found("Page", id));
        }
        store.comments.retain(|_, c| c.target != CommentTarget::Page(id));
        store.page_authors.remove(&id);
        Ok(())
    }

    async fn list_page_contents(&self, page_id: Uuid) -> AppResult<Vec<PageContent>> {
        let store = self.store.read().await;
        Ok(find::<Page>(&store, page_id)?.contents.to_vec())
    }

    async fn get_page_content(&self, page_id: Uuid, language_id: Uuid) -> AppResult<PageContent> {
        get_content::<Page>(&*self.store.read().await, page_id, language_id)
    }

    async fn attach_page_content(&self, page_id: Uuid, language_id: Uuid, fields: ArticleFields) -> AppResult<PageContent> {
        attach_content::<Page, _>(&mut *self.store.write().await, page_id, language_id, fields)
    }

    async fn update_page_content(&self, page_id: Uuid, language_id: Uuid, fields: ArticleFields) -> AppResult<PageContent> {
        update_content::<Page, _>(&mut *self.store.write().await, page_id, language_id, fields)
    }

    async fn remove_page_content(&self, page_id: Uuid, language_id: Uuid) -> AppResult<()> {
        remove_content::<Page>(&mut *self.store.write().await, page_id, language_id)
    }

    async fn list_page_authors(&self, page_id: Uuid) -> AppResult<Vec<Author>> {
        list_authors::<Page>(&*self.store.read().await, page_id)
    }

    async fn list_pages_by_author(&self, user_id: Uuid, published_only: bool) -> AppResult<Vec<PageResponse>> {
        list_by_author::<Page>(&*self.store.read().await, user_id, published_only)
    }

    async fn assign_page_author(&self, page_id: Uuid, user_id: Uuid) -> AppResult<Vec<Author>> {
        assign_author::<Page>(&mut *self.store.write().await, page_id, user_id)
    }

    async fn remove_page_author(&self, page_id: Uuid, user_id: Uuid) -> AppResult<()> {
        remove_author::<Page>(&mut *self.store.write().await, page_id, user_id)
    }

    // --- Posts ---

    async fn list_posts(&self, published_only: bool) -> AppResult<Vec<PostResponse>> {
        let store = self.store.read().await;
        Ok(list_aggregates::<Post>(&store, |p| !published_only || p.published))
    }

    async fn get_post(&self, id: Uuid) -> AppResult<PostResponse> {
        let store = self.store.read().await;
        Ok(find::<Post>(&store, id)?.assemble_response())
    }

    async fn create_post(&self, meta: ArticleMeta) -> AppResult<PostResponse> {
        let mut store = self.store.write().await;
        insert_meta::<Post, _>(&mut store, meta, |id, meta, now| Post {
            id,
            link_id: meta.link_id,
            thumbnail: meta.thumbnail,
            comments_enabled: meta.comments_enabled,
            published: meta.published,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update_post(&self, id: Uuid, meta: ArticleMeta) -> AppResult<PostResponse> {
        let mut store = self.store.write().await;
        store.ensure_link(meta.link_id)?;
        let now = store.tick();
        let aggregate = find_mut::<Post>(&mut store, id)?;
        let post = &mut aggregate.parent;
        post.link_id = meta.link_id;
        post.thumbnail = meta.thumbnail;
        post.comments_enabled = meta.comments_enabled;
        post.published = meta.published;
        post.updated_at = next_update_stamp(post.updated_at, now);
        Ok(aggregate.assemble_response())
    }

    async fn set_post_published(&self, id: Uuid, published: bool) -> AppResult<PostResponse> {
        let mut store = self.store.write().await;
        let now = store.tick();
        let aggregate = find_mut::<Post>(&mut store, id)?;
        aggregate.parent.published = published;
        aggregate.parent.updated_at = next_update_stamp(aggregate.parent.updated_at, now);
        Ok(aggregate.assemble_response())
    }

    async fn delete_post(&self, id: Uuid) -> AppResult<()> {
        let mut store = self.store.write().await;
        if store.posts.remove(&id).is_none() {
            return Err(ApiError::not_found("Post", id));
        }
        store.comments.retain(|_, c| c.target != CommentTarget::Post(id));
        store.post_authors.remove(&id);
        Ok(())
    }

    async fn list_post_contents(&self, post_id: Uuid) -> AppResult<Vec<PostContent>> {
        let store = self.store.read().await;
        Ok(find::<Post>(&store, post_id)?.contents.to_vec())
    }

    async fn get_post_content(&self, post_id: Uuid, language_id: Uuid) -> AppResult<PostContent> {
        get_content::<Post>(&*self.store.read().await, post_id, language_id)
    }

    async fn attach_post_content(&self, post_id: Uuid, language_id: Uuid, fields: ArticleFields) -> AppResult<PostContent> {
        attach_content::<Post, _>(&mut *self.store.write().await, post_id, language_id, fields)
    }

    async fn update_post_content(&self, post_id: Uuid, language_id: Uuid, fields: ArticleFields) -> AppResult<PostContent> {
        update_content::<Post, _>(&mut *self.store.write().await, post_id, language_id, fields)
    }

    async fn remove_post_content(&self, post_id: Uuid, language_id: Uuid) -> AppResult<()> {
        remove_content::<Post>(&mut *self.store.write().await, post_id, language_id)
    }

    async fn list_post_authors(&self, post_id: Uuid) -> AppResult<Vec<Author>> {
        list_authors::<Post>(&*self.store.read().await, post_id)
    }

    async fn list_posts_by_author(&self, user_id: Uuid, published_only: bool) -> AppResult<Vec<PostResponse>> {
        list_by_author::<Post>(&*self.store.read().await, user_id, published_only)
    }

    async fn assign_post_author(&self, post_id: Uuid, user_id: Uuid) -> AppResult<Vec<Author>> {
        assign_author::<Post>(&mut *self.store.write().await, post_id, user_id)
    }

    async fn remove_post_author(&self, post_id: Uuid, user_id: Uuid) -> AppResult<()> {
        remove_author::<Post>(&mut *self.store.write().await, post_id, user_id)
    }

    // --- Homepages ---

    async fn list_homepages(&self) -> AppResult<Vec<HomepageResponse>> {
        let store = self.store.read().await;
        Ok(list_aggregates::<Homepage>(&store, |_| true))
    }

    async fn get_homepage(&self, id: Uuid) -> AppResult<HomepageResponse> {
        let store = self.store.read().await;
        Ok(find::<Homepage>(&store, id)?.assemble_response())
    }

    async fn create_homepage(&self, req: HomepageRequest) -> AppResult<HomepageResponse> {
        let mut store = self.store.write().await;
        store.ensure_link(req.link_id)?;
        let now = store.tick();
        let homepage = Homepage {
            id: Uuid::new_v4(),
            link_id: req.link_id,
            thumbnail: req.thumbnail,
            created_at: now,
            updated_at: now,
        };
        let aggregate = Localized::new(homepage);
        let response = aggregate.assemble_response();
        store.homepages.insert(aggregate.parent.id, aggregate);
        Ok(response)
    }

    async fn update_homepage(&self, id: Uuid, req: HomepageRequest) -> AppResult<HomepageResponse> {
        let mut store = self.store.write().await;
        store.ensure_link(req.link_id)?;
        let now = store.tick();
        let aggregate = find_mut::<Homepage>(&mut store, id)?;
        aggregate.parent.link_id = req.link_id;
        aggregate.parent.thumbnail = req.thumbnail;
        aggregate.parent.updated_at = next_update_stamp(aggregate.parent.updated_at, now);
        Ok(aggregate.assemble_response())
    }

    async fn delete_homepage(&self, id: Uuid) -> AppResult<()> {
        let mut store = self.store.write().await;
        store
            .homepages
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found("Homepage", id))
    }

    async fn list_homepage_contents(&self, homepage_id: Uuid) -> AppResult<Vec<HomepageContent>> {
        let store = self.store.read().await;
        Ok(find::<Homepage>(&store, homepage_id)?.contents.to_vec())
    }

    async fn get_homepage_content(&self, homepage_id: Uuid, language_id: Uuid) -> AppResult<HomepageContent> {
        get_content::<Homepage>(&*self.store.read().await, homepage_id, language_id)
    }

    async fn attach_homepage_content(&self, homepage_id: Uuid, language_id: Uuid, fields: HomepageFields) -> AppResult<HomepageContent> {
        attach_content::<Homepage, _>(&mut *self.store.write().await, homepage_id, language_id, fields)
    }

    async fn update_homepage_content(&self, homepage_id: Uuid, language_id: Uuid, fields: HomepageFields) -> AppResult<HomepageContent> {
        update_content::<Homepage, _>(&mut *self.store.write().await, homepage_id, language_id, fields)
    }

    async fn remove_homepage_content(&self, homepage_id: Uuid, language_id: Uuid) -> AppResult<()> {
        remove_content::<Homepage>(&mut *self.store.write().await, homepage_id, language_id)
    }

    // --- Comments ---

    async fn list_comments(&self, target: CommentTarget) -> AppResult<Vec<Comment>> {
        let store = self.store.read().await;
        store.comments_enabled(target)?;
        Ok(store.sorted_comments(|c| c.target == target))
    }

    async fn list_user_comments(&self, user_id: Uuid) -> AppResult<Vec<Comment>> {
        let store = self.store.read().await;
        store.stored_user(user_id)?;
        Ok(store.sorted_comments(|c| c.author.id == user_id))
    }

    async fn create_comment(&self, author_id: Uuid, target: CommentTarget, content: String) -> AppResult<Comment> {
        let mut store = self.store.write().await;
        let author = store.stored_user(author_id)?.user.author();
        if !store.comments_enabled(target)? {
            return Err(ApiError::forbidden(format!(
                "Comments are disabled for {} {}",
                target.kind(),
                target.id()
            )));
        }
        if !store.global_comments_enabled() {
            return Err(ApiError::forbidden("Comments are disabled site-wide"));
        }
        let now = store.tick();
        let comment = Comment {
            id: Uuid::new_v4(),
            content,
            target,
            author,
            created_at: now,
            updated_at: now,
        };
        store.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: Uuid, author_id: Uuid, content: String) -> AppResult<Comment> {
        let mut store = self.store.write().await;
        let now = store.tick();
        let comment = store
            .comments
            .get_mut(&id)
            .filter(|c| c.author.id == author_id)
            .ok_or_else(|| ApiError::not_found("Comment", id))?;
        comment.content = content;
        comment.updated_at = next_update_stamp(comment.updated_at, now);
        let comment = comment.clone();
        Ok(store.with_author(comment))
    }

    async fn delete_comment(&self, id: Uuid, author_id: Option<Uuid>) -> AppResult<()> {
        let mut store = self.store.write().await;
        let owned = store
            .comments
            .get(&id)
            .is_some_and(|c| author_id.is_none_or(|author| c.author.id == author));
        if !owned {
            return Err(ApiError::not_found("Comment", id));
        }
        store.comments.remove(&id);
        Ok(())
    }

    // --- Global settings ---

    async fn get_settings(&self) -> AppResult<GlobalSettings> {
        self.store
            .read()
            .await
            .settings
            .clone()
            .ok_or_else(|| ApiError::NotFound("Global settings not found".to_string()))
    }

    async fn save_settings(&self, changes: SettingsChanges) -> AppResult<GlobalSettings> {
        let mut store = self.store.write().await;
        let now = store.tick();
        let settings = match store.settings.take() {
            Some(current) => changes.into_settings(
                current.id,
                current.created_at,
                next_update_stamp(current.updated_at, now),
            ),
            None => changes.into_settings(Uuid::new_v4(), now, now),
        };
        store.settings = Some(settings.clone());
        Ok(settings)
    }
}
