//! Users, follows and news feeds

use crate::models::{Admin, Post, USER_TYPE, User, UserAndPosts};
use chrono::Utc;
use quadgraph_core::{NodeRef, Result, vocab};
use quadgraph_graph::Graph;
use quadgraph_query::Path;
use tracing::debug;

/// Nodes written by [`seed`]
#[derive(Debug, Clone)]
pub struct Seeded {
    pub admin: NodeRef,

    /// Followed by alice
    pub bob: NodeRef,
    pub alice: NodeRef,

    /// Bob's posts, oldest first
    pub bob_posts: Vec<NodeRef>,
    pub alice_posts: Vec<NodeRef>,
}

/// Write an administrator, two users where alice follows bob, and their posts
pub fn seed(graph: &Graph) -> Result<Seeded> {
    let mut admin = Admin {
        name: "admin1".to_string(),
        email: "foo@gmail.com".to_string(),
        hashed_password: "435iue8uou9eu".to_string(),
        ..Default::default()
    };
    let admin = graph.insert(&mut admin)?;

    let mut bob = User::new("bob", "bob@gmail.com");
    bob.hashed_password = "123".to_string();
    let bob = graph.insert(&mut bob)?;

    let mut alice = User::new("alice", "alice@gmail.com");
    alice.hashed_password = "abc".to_string();
    alice.follows.push(bob.clone());
    let alice = graph.insert(&mut alice)?;

    let mut bob_posts = Vec::new();
    for message in ["This is an interesting post about graphs", "This is a second post"] {
        bob_posts.push(graph.insert(&mut Post::new(&bob, message, Utc::now()))?);
    }
    let alice_posts = vec![graph.insert(&mut Post::new(&alice, "Hi!", Utc::now()))?];

    debug!("Seeded news feed: bob {} alice {}", bob, alice);
    Ok(Seeded {
        admin,
        bob,
        alice,
        bob_posts,
        alice_posts,
    })
}

/// Posts by everyone `user` follows
pub fn news_feed(graph: &Graph, user: &NodeRef) -> Result<Vec<Post>> {
    let path = Path::start_from(user.clone())
        .out("follows")
        .in_("author")
        .unique();
    graph.load_path(&path)
}

/// News feed of the user with this name
pub fn news_feed_by_name(graph: &Graph, name: &str) -> Result<Vec<Post>> {
    let path = Path::start_all()
        .has(vocab::rdf_type(), NodeRef::iri(USER_TYPE))
        .has("name", name)
        .out("follows")
        .in_("author")
        .unique();
    graph.load_path(&path)
}

/// The user registered under an email address, if any
pub fn user_by_email(graph: &Graph, email: &str) -> Result<Option<User>> {
    let path = Path::start_all()
        .has(vocab::rdf_type(), NodeRef::iri(USER_TYPE))
        .has("email", email);
    graph.load_first(&path)
}

/// Every named node that has written at least one post
pub fn authors(graph: &Graph) -> Result<Vec<UserAndPosts>> {
    graph.load_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_news_feed_follows_reverse_edges() {
        let graph = Graph::in_memory();
        let seeded = seed(&graph).unwrap();

        let feed: HashSet<NodeRef> = news_feed(&graph, &seeded.alice)
            .unwrap()
            .into_iter()
            .filter_map(|p| p.id)
            .collect();
        let expected: HashSet<NodeRef> = seeded.bob_posts.iter().cloned().collect();
        assert_eq!(feed, expected);

        assert!(news_feed(&graph, &seeded.bob).unwrap().is_empty());
        assert_eq!(news_feed_by_name(&graph, "alice").unwrap().len(), 2);
    }

    #[test]
    fn test_user_by_email() {
        let graph = Graph::in_memory();
        let seeded = seed(&graph).unwrap();

        let alice = user_by_email(&graph, "alice@gmail.com").unwrap().unwrap();
        assert_eq!(alice.id, Some(seeded.alice));
        assert_eq!(alice.follows, vec![seeded.bob]);
        assert!(user_by_email(&graph, "nobody@gmail.com").unwrap().is_none());

        // The administrator's address does not belong to a user
        assert!(user_by_email(&graph, "foo@gmail.com").unwrap().is_none());
    }

    #[test]
    fn test_user_by_email_ignores_admin_with_same_address() {
        let graph = Graph::in_memory();
        let mut admin = Admin {
            name: "alice".to_string(),
            email: "alice@gmail.com".to_string(),
            ..Default::default()
        };
        graph.insert(&mut admin).unwrap();
        let seeded = seed(&graph).unwrap();

        let alice = user_by_email(&graph, "alice@gmail.com").unwrap().unwrap();
        assert_eq!(alice.id, Some(seeded.alice));
        assert_eq!(news_feed_by_name(&graph, "alice").unwrap().len(), 2);
    }

    #[test]
    fn test_authors_skip_admins() {
        let graph = Graph::in_memory();
        let seeded = seed(&graph).unwrap();

        let authors = authors(&graph).unwrap();
        let names: HashSet<&str> = authors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, HashSet::from(["bob", "alice"]));

        let bob = authors.iter().find(|a| a.name == "bob").unwrap();
        assert_eq!(bob.posts.len(), 2);
        assert!(bob.posts.iter().all(|p| p.author == seeded.bob));
        assert!(authors.iter().all(|a| a.id.as_ref() != Some(&seeded.admin)));
    }
}
