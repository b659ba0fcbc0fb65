//! End-to-end behaviour of the record layer with the demo models

use chrono::{TimeZone, Utc};
use quadgraph_core::{Error, NodeRef, Quad, QuadPattern, UuidGenerator, Value, vocab};
use quadgraph_demo::models::{ADMIN_TYPE, days};
use quadgraph_demo::{Admin, Clinic, OpeningHours, Post, User, UserAndPosts};
use quadgraph_demo::{clinics, credentials, feed};
use quadgraph_graph::{Graph, GraphConfig};
use quadgraph_query::Path;
use quadgraph_storage::MemoryStore;
use std::collections::HashSet;
use std::sync::Arc;

fn clinic() -> Clinic {
    Clinic {
        name: "Harbour Clinic".to_string(),
        address: "4 Dock st".to_string(),
        office_tel: "555 0199".to_string(),
        hours: vec![
            OpeningHours {
                day: days::TUESDAY.to_string(),
                slot: 0,
                opens: "08:00".to_string(),
                closes: "12:00".to_string(),
                ..Default::default()
            },
            OpeningHours {
                day: days::THURSDAY.to_string(),
                slot: 0,
                opens: "14:00".to_string(),
                closes: "18:00:00".to_string(),
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

fn fixture(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

#[test]
fn test_round_trip_preserves_every_field() {
    let graph = Graph::in_memory();

    let mut post = Post::new(
        &NodeRef::iri("author-1"),
        "This is an interesting post about graphs",
        Utc.with_ymd_and_hms(2018, 3, 14, 15, 9, 26).unwrap(),
    );
    let id = graph.insert(&mut post).unwrap();
    assert_eq!(post.id.as_ref(), Some(&id));
    assert_eq!(graph.load::<Post>(&id).unwrap(), post);

    let mut user = User::new("bob", "bob@gmail.com");
    user.follows = vec![NodeRef::iri("u3"), NodeRef::iri("u1"), NodeRef::iri("u2")];
    let id = graph.insert(&mut user).unwrap();
    assert_eq!(graph.load::<User>(&id).unwrap(), user);

    let mut c = clinic();
    let id = graph.insert(&mut c).unwrap();
    let loaded: Clinic = graph.load(&id).unwrap();
    assert_eq!(loaded.name, c.name);
    assert_eq!(loaded.address, c.address);
    assert_eq!(loaded.office_tel, c.office_tel);
    let weekdays: Vec<&str> = loaded.hours.iter().map(|h| h.day.as_str()).collect();
    assert_eq!(weekdays, vec![days::TUESDAY, days::THURSDAY]);
    assert_eq!(loaded.hours[1].closes, "18:00:00");
}

#[test]
fn test_identifiers_are_distinct() {
    let graph = Graph::in_memory();
    let mut seen = HashSet::new();
    for i in 0..50 {
        let mut user = User::new(&format!("user{}", i), "");
        assert!(seen.insert(graph.insert(&mut user).unwrap()));
    }
}

#[test]
fn test_register_is_idempotent() {
    let graph = Graph::in_memory();
    graph.register::<Clinic>().unwrap();
    graph.register::<Clinic>().unwrap();

    let mut c = clinic();
    let id = graph.insert(&mut c).unwrap();
    assert_eq!(graph.load::<Clinic>(&id).unwrap().hours.len(), 2);
}

#[test]
fn test_excluded_field_is_never_written() {
    let graph = Graph::in_memory();
    let mut admin = Admin {
        name: "Josh".to_string(),
        email: "josh_f@gmail.com".to_string(),
        hashed_password: "435iue8uou9eu".to_string(),
        password: "plain".to_string(),
        ..Default::default()
    };
    let id = graph.insert(&mut admin).unwrap();

    let quads = graph
        .quads_matching(&QuadPattern::any().subject(id.clone()))
        .unwrap();
    assert!(quads.iter().all(|q| q.predicate != NodeRef::iri("password")));
    assert!(quads.iter().all(|q| q.object != Value::from("plain")));
    assert!(graph.load::<Admin>(&id).unwrap().password.is_empty());
}

#[test]
fn test_blank_optional_field_is_omitted() {
    let graph = Graph::in_memory();
    let mut admin = Admin {
        email: "nameless@gmail.com".to_string(),
        ..Default::default()
    };
    let id = graph.insert(&mut admin).unwrap();

    let names = graph
        .quads_matching(&QuadPattern::any().subject(id.clone()).predicate(NodeRef::iri("name")))
        .unwrap();
    assert!(names.is_empty());
    assert_eq!(graph.load::<Admin>(&id).unwrap().name, "");
}

#[test]
fn test_required_field_is_enforced_on_read() {
    let graph = Graph::in_memory();
    let mut nameless = Clinic {
        address: "nowhere".to_string(),
        ..Default::default()
    };
    let id = graph.insert(&mut nameless).unwrap();

    match graph.load::<Clinic>(&id) {
        Err(Error::RequiredFieldMissing { entity, field }) => {
            assert_eq!(entity, "Clinic");
            assert_eq!(field, "name");
        }
        other => panic!("expected a missing name, got {:?}", other),
    }
}

#[test]
fn test_news_feed_is_reverse_traversal() {
    let graph = Graph::in_memory();

    let mut u1 = User::new("bob", "bob@gmail.com");
    let u1 = graph.insert(&mut u1).unwrap();
    let mut u2 = User::new("carol", "carol@gmail.com");
    let u2 = graph.insert(&mut u2).unwrap();
    let mut reader = User::new("alice", "alice@gmail.com");
    reader.follows.push(u2.clone());
    let reader = graph.insert(&mut reader).unwrap();

    let p1 = graph.insert(&mut Post::new(&u2, "first", Utc::now())).unwrap();
    let p2 = graph.insert(&mut Post::new(&u2, "second", Utc::now())).unwrap();
    graph.insert(&mut Post::new(&u1, "unfollowed", Utc::now())).unwrap();

    let feed: HashSet<NodeRef> = feed::news_feed(&graph, &reader)
        .unwrap()
        .into_iter()
        .filter_map(|p| p.id)
        .collect();
    assert_eq!(feed, HashSet::from([p1, p2]));
}

#[test]
fn test_failed_commit_is_invisible() {
    let store = Arc::new(MemoryStore::new());
    let graph = Graph::new(store.clone(), Arc::new(UuidGenerator::new()));

    store.inject_commit_failure(1).unwrap();
    let mut tx = graph.begin().unwrap();
    for i in 1..=3i64 {
        tx.add(Quad::new(NodeRef::iri("s"), "p", i)).unwrap();
    }
    assert!(matches!(tx.commit(), Err(Error::StoreUnavailable(_))));
    assert!(graph.quads().unwrap().is_empty());

    // The slot is free again and the store works once the fault is spent
    let mut user = User::new("bob", "bob@gmail.com");
    graph.insert(&mut user).unwrap();
    assert!(!graph.quads().unwrap().is_empty());
}

#[test]
fn test_update_leaves_one_address() {
    let graph = Graph::in_memory();
    let c = clinics::register(&graph, clinics::load_json(fixture("clinic.json")).unwrap(), None).unwrap();
    let id = c.id.clone().unwrap();

    let changes = clinics::load_json(fixture("updated-clinic.json")).unwrap();
    let updated = clinics::apply_update(&graph, &id, &changes).unwrap();
    assert_eq!(updated.address, "Seasame st");
    assert_eq!(updated.hours.len(), 4);

    let addresses = graph
        .quads_matching(&QuadPattern::any().subject(id.clone()).predicate(NodeRef::iri("address")))
        .unwrap();
    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].object, Value::from("Seasame st"));

    // Only the current hours remain
    let hours = graph
        .quads_matching(
            &QuadPattern::any()
                .predicate(vocab::rdf_type())
                .object(NodeRef::iri("schema:OpeningHoursSpecification")),
        )
        .unwrap();
    assert_eq!(hours.len(), 4);
}

#[test]
fn test_regex_filter_on_admin_email() {
    let graph = Graph::in_memory();
    for email in ["me@fake.com", "me2@fake.com", "dog@fake.com"] {
        credentials::create_admin(&graph, "", email, "pw").unwrap();
    }

    let mut emails: Vec<String> = credentials::admins_matching(&graph, "^me.*")
        .unwrap()
        .into_iter()
        .map(|a| a.email)
        .collect();
    emails.sort();
    assert_eq!(emails, vec!["me2@fake.com", "me@fake.com"]);

    assert!(matches!(
        credentials::admins_matching(&graph, "(unclosed"),
        Err(Error::InvalidPattern(_))
    ));
}

#[test]
fn test_projection_skips_nodes_without_posts() {
    let graph = Graph::in_memory();

    let mut u1 = User::new("bob", "bob@gmail.com");
    let u1 = graph.insert(&mut u1).unwrap();
    let mut u2 = User::new("alice", "alice@gmail.com");
    graph.insert(&mut u2).unwrap();
    graph.insert(&mut Post::new(&u1, "hello", Utc::now())).unwrap();

    let authors: Vec<UserAndPosts> = graph.load_all().unwrap();
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].name, "bob");
    assert_eq!(authors[0].posts.len(), 1);
    assert_eq!(authors[0].posts[0].message, "hello");

    let mut view = authors[0].clone();
    view.id = None;
    assert!(matches!(graph.insert(&mut view), Err(Error::Validation(_))));
}

#[test]
fn test_delete_node_removes_both_directions() {
    let graph = Graph::in_memory();
    let seeded = feed::seed(&graph).unwrap();

    graph.remove_node(&seeded.bob).unwrap();

    let touching: Vec<Quad> = graph
        .quads()
        .unwrap()
        .into_iter()
        .filter(|q| q.subject == seeded.bob || q.object == Value::Node(seeded.bob.clone()))
        .collect();
    assert!(touching.is_empty());
    assert!(feed::news_feed(&graph, &seeded.alice).unwrap().is_empty());
    assert!(graph.load::<User>(&seeded.alice).unwrap().follows.is_empty());
}

#[test]
fn test_admin_lookup_and_login() {
    let graph = Graph::in_memory();
    let created = credentials::create_admin(&graph, "Josh", "josh_f@gmail.com", "s3cret").unwrap();

    let path = Path::start_all()
        .has("email", "josh_f@gmail.com")
        .has(vocab::rdf_type(), NodeRef::iri(ADMIN_TYPE));
    assert_eq!(graph.query().count(&path).unwrap(), 1);

    let admin = credentials::login_admin(&graph, "josh_f@gmail.com", "s3cret").unwrap().unwrap();
    assert_eq!(admin.id, created.id);
    assert!(credentials::login_admin(&graph, "josh_f@gmail.com", "wrong").unwrap().is_none());
    assert!(matches!(
        credentials::login_admin(&graph, "not an email", "s3cret"),
        Err(Error::Validation(_))
    ));
}

#[test]
fn test_persistent_graph_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = GraphConfig::rocksdb(dir.path().join("db"));

    let id = {
        let graph = Graph::open(&config).unwrap();
        let mut c = clinic();
        graph.insert(&mut c).unwrap()
    };

    let graph = Graph::open(&config).unwrap();
    let loaded: Clinic = graph.load(&id).unwrap();
    assert_eq!(loaded.name, "Harbour Clinic");
    assert_eq!(loaded.hours.len(), 2);
}

#[test]
fn test_load_rejects_missing_and_foreign_nodes() {
    let graph = Graph::in_memory();
    assert!(matches!(
        graph.load::<User>(&NodeRef::iri("does-not-exist")),
        Err(Error::NodeNotFound(_))
    ));

    let admin = credentials::create_admin(&graph, "Josh", "josh@x.com", "pw").unwrap();
    let id = admin.id.unwrap();
    assert!(matches!(graph.load::<User>(&id), Err(Error::NodeNotFound(_))));
    assert_eq!(graph.load::<Admin>(&id).unwrap().name, "Josh");
}
