//! Posts state: the record store and the request registry.
//!
//! The collection keeps the order the service and the caller produced; nothing
//! here sorts. Post ids are unique within the collection. The editing selection
//! is an id resolved against the collection on read, so it cannot drift from
//! the stored post.

use crate::action::OperationKind;
use crate::types::{Post, PostId, RequestId};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Tracks the one operation the loading indicator belongs to.
///
/// `loading` is true exactly while `current_request_id` names an operation that
/// has started, not terminated, and not been superseded by a later start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestRegistry {
    loading: bool,
    current_request_id: Option<RequestId>,
}

impl RequestRegistry {
    /// Whether an operation currently owns the loading indicator.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// The operation that owns the loading indicator.
    #[must_use]
    pub const fn current_request_id(&self) -> Option<RequestId> {
        self.current_request_id
    }

    /// Hand the indicator to `request_id`, returning the owner it replaces.
    pub(crate) fn begin(&mut self, request_id: RequestId) -> Option<RequestId> {
        self.loading = true;
        self.current_request_id.replace(request_id)
    }

    /// Release the indicator if `request_id` still owns it.
    ///
    /// Returns `false` and changes nothing for any other id.
    pub(crate) fn settle(&mut self, request_id: RequestId) -> bool {
        if self.loading && self.current_request_id == Some(request_id) {
            self.loading = false;
            self.current_request_id = None;
            true
        } else {
            false
        }
    }
}

/// A successful update or delete whose target was not in the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedMutation {
    /// Invocation that produced the result
    pub request_id: RequestId,
    /// Update or delete
    pub kind: OperationKind,
    /// The id that matched nothing
    pub id: PostId,
}

/// State of the posts feature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostsState {
    posts: Vec<Post>,
    editing: Option<PostId>,
    registry: RequestRegistry,
    last_synced_at: Option<DateTime<Utc>>,
    unmatched: Vec<UnmatchedMutation>,
    /// Dispatched operations without a response yet, and whether each was aborted
    in_flight: HashMap<RequestId, bool>,
}

impl PostsState {
    /// Empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State holding `posts`, deduplicated as by [`PostsState::replace_all`].
    #[must_use]
    pub fn with_posts(posts: Vec<Post>) -> Self {
        let mut state = Self::default();
        state.replace_all(posts);
        state
    }

    /// The collection, in order.
    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Look a post up by id.
    #[must_use]
    pub fn post(&self, id: &PostId) -> Option<&Post> {
        self.posts.iter().find(|post| &post.id == id)
    }

    /// The post selected for editing, resolved against the collection.
    #[must_use]
    pub fn editing_post(&self) -> Option<&Post> {
        self.editing.as_ref().and_then(|id| self.post(id))
    }

    /// Id of the post selected for editing.
    #[must_use]
    pub const fn editing_id(&self) -> Option<&PostId> {
        self.editing.as_ref()
    }

    /// Whether an operation owns the loading indicator.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.registry.is_loading()
    }

    /// The operation owning the loading indicator.
    #[must_use]
    pub const fn current_request_id(&self) -> Option<RequestId> {
        self.registry.current_request_id()
    }

    /// The request registry.
    #[must_use]
    pub const fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    /// When a list result was last applied.
    #[must_use]
    pub const fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.last_synced_at
    }

    /// Update and delete results that found no target.
    #[must_use]
    pub fn unmatched(&self) -> &[UnmatchedMutation] {
        &self.unmatched
    }

    /// Whether `request_id` was dispatched and has not responded yet.
    #[must_use]
    pub fn is_in_flight(&self, request_id: RequestId) -> bool {
        self.in_flight.contains_key(&request_id)
    }

    /// Number of dispatched operations that have not responded yet.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Overwrite the collection.
    ///
    /// Later duplicates of an id are dropped. Returns how many were dropped.
    pub fn replace_all(&mut self, posts: Vec<Post>) -> usize {
        let received = posts.len();
        let mut seen = HashSet::with_capacity(received);
        self.posts = posts
            .into_iter()
            .filter(|post| seen.insert(post.id.clone()))
            .collect();
        received - self.posts.len()
    }

    /// Add a post at the end.
    ///
    /// A post whose id is already present replaces the stored one in place
    /// instead. Returns `false` in that case.
    pub fn append(&mut self, post: Post) -> bool {
        match self.position(&post.id) {
            Some(index) => {
                self.posts[index] = post;
                false
            },
            None => {
                self.posts.push(post);
                true
            },
        }
    }

    /// Replace the stored post with the same id, keeping its position.
    ///
    /// Clears the editing selection if it pointed at that post. Returns
    /// `false` and leaves the collection untouched if no post matches.
    pub fn replace_by_id(&mut self, post: Post) -> bool {
        let Some(index) = self.position(&post.id) else {
            return false;
        };
        if self.editing.as_ref() == Some(&post.id) {
            self.editing = None;
        }
        self.posts[index] = post;
        true
    }

    /// Remove the post with this id.
    ///
    /// Clears the editing selection if it pointed at that post. Returns
    /// `false` if no post matches.
    pub fn remove_by_id(&mut self, id: &PostId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        self.posts.remove(index);
        if self.editing.as_ref() == Some(id) {
            self.editing = None;
        }
        true
    }

    /// Select the post `id` for editing.
    ///
    /// Selects nothing if the id is not in the collection; returns whether a
    /// post was selected.
    pub fn set_editing_selection(&mut self, id: &PostId) -> bool {
        self.editing = self.position(id).map(|_| id.clone());
        self.editing.is_some()
    }

    /// Drop the editing selection.
    pub fn clear_editing_selection(&mut self) {
        self.editing = None;
    }

    pub(crate) fn registry_mut(&mut self) -> &mut RequestRegistry {
        &mut self.registry
    }

    pub(crate) fn mark_synced(&mut self, at: DateTime<Utc>) {
        self.last_synced_at = Some(at);
    }

    pub(crate) fn record_unmatched(&mut self, mutation: UnmatchedMutation) {
        self.unmatched.push(mutation);
    }

    pub(crate) fn track(&mut self, request_id: RequestId) {
        self.in_flight.insert(request_id, false);
    }

    /// Mark `request_id` aborted; `false` if it is not in flight.
    pub(crate) fn mark_aborted(&mut self, request_id: RequestId) -> bool {
        match self.in_flight.get_mut(&request_id) {
            Some(aborted) => {
                *aborted = true;
                true
            },
            None => false,
        }
    }

    /// Stop tracking `request_id`, returning whether it was aborted.
    pub(crate) fn untrack(&mut self, request_id: RequestId) -> Option<bool> {
        self.in_flight.remove(&request_id)
    }

    fn position(&self, id: &PostId) -> Option<usize> {
        self.posts.iter().position(|post| &post.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(state: &PostsState) -> Vec<&str> {
        state.posts().iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn replace_all_keeps_first_occurrence() {
        let mut state = PostsState::new();
        let dropped = state.replace_all(vec![
            Post::new("1", "a"),
            Post::new("2", "b"),
            Post::new("1", "a again"),
        ]);

        assert_eq!(dropped, 1);
        assert_eq!(ids(&state), ["1", "2"]);
        assert_eq!(state.posts()[0].title, "a");
    }

    #[test]
    fn append_of_known_id_replaces_in_place() {
        let mut state = PostsState::with_posts(vec![Post::new("1", "a"), Post::new("2", "b")]);

        assert!(state.append(Post::new("3", "c")));
        assert!(!state.append(Post::new("1", "a2")));

        assert_eq!(ids(&state), ["1", "2", "3"]);
        assert_eq!(state.posts()[0].title, "a2");
    }

    #[test]
    fn replace_by_id_keeps_position_and_clears_matching_selection() {
        let mut state = PostsState::with_posts(vec![Post::new("1", "a"), Post::new("2", "b")]);
        assert!(state.set_editing_selection(&PostId::new("2")));

        assert!(state.replace_by_id(Post::new("2", "b2")));
        assert_eq!(ids(&state), ["1", "2"]);
        assert_eq!(state.posts()[1].title, "b2");
        assert!(state.editing_post().is_none());
    }

    #[test]
    fn replace_by_id_leaves_other_selection() {
        let mut state = PostsState::with_posts(vec![Post::new("1", "a"), Post::new("2", "b")]);
        state.set_editing_selection(&PostId::new("1"));

        state.replace_by_id(Post::new("2", "b2"));
        assert_eq!(state.editing_id(), Some(&PostId::new("1")));
    }

    #[test]
    fn replace_by_id_of_unknown_id_is_a_no_op() {
        let mut state = PostsState::with_posts(vec![Post::new("1", "a")]);
        let before = state.clone();

        assert!(!state.replace_by_id(Post::new("9", "z")));
        assert_eq!(state, before);
    }

    #[test]
    fn remove_by_id() {
        let mut state = PostsState::with_posts(vec![Post::new("1", "a"), Post::new("2", "b")]);
        state.set_editing_selection(&PostId::new("1"));

        assert!(!state.remove_by_id(&PostId::new("9")));
        assert!(state.remove_by_id(&PostId::new("1")));

        assert_eq!(ids(&state), ["2"]);
        assert!(state.editing_id().is_none());
    }

    #[test]
    fn editing_selection_of_unknown_id_selects_nothing() {
        let mut state = PostsState::with_posts(vec![Post::new("1", "a")]);
        state.set_editing_selection(&PostId::new("1"));

        assert!(!state.set_editing_selection(&PostId::new("missing")));
        assert!(state.editing_post().is_none());

        state.set_editing_selection(&PostId::new("1"));
        state.clear_editing_selection();
        assert!(state.editing_post().is_none());
    }

    #[test]
    fn editing_post_follows_the_collection() {
        let mut state = PostsState::with_posts(vec![Post::new("1", "a")]);
        state.set_editing_selection(&PostId::new("1"));

        // A create result for the same id replaces the stored post; the
        // selection reads the new content
        state.append(Post::new("1", "fresh"));
        assert_eq!(state.editing_post().map(|p| p.title.as_str()), Some("fresh"));
    }

    #[test]
    fn registry_settles_only_for_the_owner() {
        let mut registry = RequestRegistry::default();
        let a = RequestId::new();
        let b = RequestId::new();

        assert_eq!(registry.begin(a), None);
        assert_eq!(registry.begin(b), Some(a));

        assert!(!registry.settle(a));
        assert!(registry.is_loading());
        assert_eq!(registry.current_request_id(), Some(b));

        assert!(registry.settle(b));
        assert!(!registry.is_loading());
        assert_eq!(registry.current_request_id(), None);

        // Settling twice changes nothing
        assert!(!registry.settle(b));
    }

    #[test]
    fn abort_marks_only_operations_in_flight() {
        let mut state = PostsState::new();
        let running = RequestId::new();
        let finished = RequestId::new();

        state.track(running);
        assert!(state.is_in_flight(running));
        assert!(!state.mark_aborted(finished));
        assert!(state.mark_aborted(running));

        assert_eq!(state.untrack(running), Some(true));
        assert_eq!(state.untrack(running), None);
        assert_eq!(state.in_flight_count(), 0);
    }

    #[derive(Debug, Clone)]
    enum Mutation {
        Append(u8),
        Replace(u8),
        Remove(u8),
    }

    fn mutation() -> impl Strategy<Value = Mutation> {
        prop_oneof![
            (0_u8..12).prop_map(Mutation::Append),
            (0_u8..12).prop_map(Mutation::Replace),
            (0_u8..12).prop_map(Mutation::Remove),
        ]
    }

    proptest! {
        #[test]
        fn ids_stay_unique(
            listed in proptest::collection::vec(0_u8..12, 0..12),
            mutations in proptest::collection::vec(mutation(), 0..40),
        ) {
            let mut state = PostsState::new();
            state.replace_all(listed.iter().map(|n| Post::new(n.to_string(), "listed")).collect());

            for mutation in mutations {
                match mutation {
                    Mutation::Append(n) => { state.append(Post::new(n.to_string(), "created")); },
                    Mutation::Replace(n) => { state.replace_by_id(Post::new(n.to_string(), "updated")); },
                    Mutation::Remove(n) => { state.remove_by_id(&PostId::new(n.to_string())); },
                }
            }

            let mut seen = HashSet::new();
            for post in state.posts() {
                prop_assert!(seen.insert(post.id.clone()), "duplicate id {}", post.id);
            }
        }

        #[test]
        fn last_started_owns_the_indicator(
            order in Just((0..6_usize).collect::<Vec<_>>()).prop_shuffle(),
        ) {
            let mut registry = RequestRegistry::default();
            let ids: Vec<RequestId> = (0..6).map(|_| RequestId::new()).collect();
            for id in &ids {
                registry.begin(*id);
            }
            let owner = ids[5];

            for index in order {
                let settled = registry.settle(ids[index]);
                prop_assert_eq!(settled, ids[index] == owner);
                prop_assert_eq!(registry.is_loading(), !settled && registry.current_request_id() == Some(owner));
                if settled {
                    prop_assert_eq!(registry.current_request_id(), None);
                }
            }
            prop_assert!(!registry.is_loading());
        }
    }
}
