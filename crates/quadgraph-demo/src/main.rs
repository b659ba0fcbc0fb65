//! QuadGraph demo entry point

use clap::{Parser, Subcommand};
use quadgraph_core::{NodeRef, Result};
use quadgraph_demo::{Admin, Clinic, Post, User, clinics, credentials, feed};
use quadgraph_graph::{Graph, GraphConfig};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Example programs for the QuadGraph record layer", long_about = None)]
struct Args {
    /// JSON graph configuration
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// RocksDB directory; overrides the configured backend
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// Use a throwaway in-memory graph
    #[clap(long, global = true, conflicts_with = "db")]
    memory: bool,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register an administrator
    CreateAdmin {
        #[clap(long)]
        email: String,
        #[clap(long)]
        password: String,
        #[clap(long, default_value = "")]
        name: String,
    },

    /// Check an administrator's credentials
    LoginAdmin {
        #[clap(long)]
        email: String,
        #[clap(long)]
        password: String,
    },

    /// List administrators whose email matches a regular expression
    Admins {
        #[clap(long, default_value = ".*")]
        pattern: String,
    },

    /// Write users, follows and posts, then print alice's news feed
    NewsFeed,

    /// Register a clinic from JSON and optionally apply an update
    Clinic {
        clinic: PathBuf,
        updated: Option<PathBuf>,
    },

    /// Remove every quad in which a node takes part
    DeleteNode {
        #[clap(long)]
        id: String,
    },

    /// Print every stored quad
    Quads,
}

fn load_config(args: &Args) -> Result<GraphConfig> {
    let mut config = match &args.config {
        Some(path) => GraphConfig::from_json_file(path)?,
        None => GraphConfig::rocksdb("./quadgraph-data"),
    };
    if let Some(db) = &args.db {
        config = GraphConfig {
            backend: GraphConfig::rocksdb(db).backend,
            ..config
        };
    }
    if args.memory {
        config = GraphConfig {
            backend: GraphConfig::in_memory().backend,
            ..config
        };
    }
    Ok(config)
}

fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let graph = match Graph::open(&config) {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to open graph: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&graph, args.cmd) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(graph: &Graph, cmd: Command) -> Result<()> {
    match cmd {
        Command::CreateAdmin { email, password, name } => {
            let admin = credentials::create_admin(graph, &name, &email, &password)?;
            print_admin(&admin);
        }
        Command::LoginAdmin { email, password } => {
            match credentials::login_admin(graph, &email, &password)? {
                Some(admin) => {
                    println!("Login successful");
                    print_admin(&admin);
                }
                None => {
                    println!("Invalid email or password");
                    std::process::exit(2);
                }
            }
        }
        Command::Admins { pattern } => {
            for admin in credentials::admins_matching(graph, &pattern)? {
                print_admin(&admin);
            }
        }
        Command::NewsFeed => news_feed(graph)?,
        Command::Clinic { clinic, updated } => clinic_flow(graph, clinic, updated)?,
        Command::DeleteNode { id } => {
            let node: NodeRef = id.parse().unwrap_or_else(|never| match never {});
            let removed = graph.remove_node(&node)?;
            info!("Removed {} quads", removed);
            print_quads(graph)?;
        }
        Command::Quads => print_quads(graph)?,
    }
    Ok(())
}

fn news_feed(graph: &Graph) -> Result<()> {
    feed::seed(graph)?;
    print_quads(graph)?;

    println!("admins:");
    for admin in graph.load_all::<Admin>()? {
        print_admin(&admin);
    }
    println!();

    println!("users:");
    for user in graph.load_all::<User>()? {
        println!("{:?}", user);
    }
    println!();

    println!("posts:");
    for post in graph.load_all::<Post>()? {
        print_post(&post);
    }
    println!();

    println!("posts by users:");
    for author in feed::authors(graph)? {
        println!("{} ({} posts)", author.name, author.posts.len());
        for post in &author.posts {
            print_post(post);
        }
    }
    println!();

    if let Some(alice) = feed::user_by_email(graph, "alice@gmail.com")? {
        println!("user by email:\n{:?}\n", alice);
    }

    println!("news feed of alice:");
    for post in feed::news_feed_by_name(graph, "alice")? {
        print_post(&post);
    }
    println!();
    Ok(())
}

fn clinic_flow(graph: &Graph, clinic: PathBuf, updated: Option<PathBuf>) -> Result<()> {
    let email = "josh_f@gmail.com";
    let admin = match credentials::find_admin_id(graph, email)? {
        Some(id) => id,
        None => {
            let mut admin = Admin {
                name: "Josh".to_string(),
                email: email.to_string(),
                hashed_password: credentials::hash_password("josh")?,
                ..Default::default()
            };
            graph.insert(&mut admin)?
        }
    };

    let registered = clinics::register(graph, clinics::load_json(&clinic)?, Some(admin))?;
    let Some(id) = registered.id.clone() else {
        return Ok(());
    };

    if let Some(updated) = updated {
        clinics::apply_update(graph, &id, &clinics::load_json(&updated)?)?;
    }

    println!("admins:");
    for admin in graph.load_all::<Admin>()? {
        print_admin(&admin);
    }
    println!();

    println!("clinics:");
    for clinic in graph.load_all::<Clinic>()? {
        println!("{:#?}", clinic);
    }
    println!();

    print_quads(graph)
}

fn print_admin(admin: &Admin) {
    let id = admin.id.as_ref().map(ToString::to_string).unwrap_or_default();
    println!("{} name={:?} email={}", id, admin.name, admin.email);
}

fn print_post(post: &Post) {
    println!("[{}] {}: {}", post.created.to_rfc3339(), post.author, post.message);
}

fn print_quads(graph: &Graph) -> Result<()> {
    println!("quads:");
    for quad in graph.quads()? {
        println!("{}", quad);
    }
    println!();
    Ok(())
}
