use clap::{Parser, Subcommand, ValueEnum};
use datafold_acl::{
    load_access_config, AccessCondition, AccessNode, AccessType, Ed25519KeyPair, PublicSignKey,
    Role,
};
use log::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the access configuration file (JSON or TOML)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliRole {
    Admin,
    Writer,
    Guest,
}

impl From<CliRole> for Role {
    fn from(role: CliRole) -> Self {
        match role {
            CliRole::Admin => Role::Admin,
            CliRole::Writer => Role::Writer,
            CliRole::Guest => Role::Guest,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliAccessType {
    Any,
    Read,
    Write,
}

impl From<CliAccessType> for AccessType {
    fn from(access: CliAccessType) -> Self {
        match access {
            CliAccessType::Any => AccessType::Any,
            CliAccessType::Read => AccessType::Read,
            CliAccessType::Write => AccessType::Write,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new ed25519 identity
    Keygen,
    #[command(flatten)]
    Node(NodeCommands),
}

/// Commands that operate on the policy store
#[derive(Subcommand)]
enum NodeCommands {
    /// Show the role directly assigned to an identity
    GetRole {
        /// Base64 public key
        #[arg(long)]
        identity: String,
    },
    /// Assign a role to an identity
    SetRole {
        #[arg(long)]
        identity: String,
        #[arg(long, value_enum)]
        role: CliRole,
        /// Base64 public key of the administrator making the change
        #[arg(long)]
        actor: String,
    },
    /// Remove the role assigned to an identity
    RevokeRole {
        #[arg(long)]
        identity: String,
        #[arg(long)]
        actor: String,
    },
    /// Grant access to every identity
    AddOpenRule {
        #[arg(long = "access", value_enum, required = true)]
        access: Vec<CliAccessType>,
        #[arg(long)]
        actor: String,
    },
    /// Check whether an identity may read
    CanRead {
        #[arg(long)]
        identity: String,
    },
    /// Check whether an operation signed by the given identities may be written
    CanWrite {
        #[arg(long = "signer", required = true)]
        signers: Vec<String>,
    },
    /// List every policy record
    List,
}

fn parse_key(value: &str) -> Result<PublicSignKey, Box<dyn std::error::Error>> {
    Ok(value.parse::<PublicSignKey>()?)
}

fn keygen() {
    let keypair = Ed25519KeyPair::generate();
    println!("public_key: {}", keypair.public_key());
    println!("secret_key: {}", keypair.secret_key_base64());
}

async fn run_node_command(
    config_path: Option<&str>,
    command: NodeCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_access_config(config_path)?;
    datafold_acl::logging::init(&config.log_level);

    info!("Opening access node...");
    let node = AccessNode::open(config).await?;
    let resolver = node.resolver();

    match command {
        NodeCommands::GetRole { identity } => {
            let identity = parse_key(&identity)?;
            match resolver.get_role(&identity).await? {
                Some(role) => println!("{}", role),
                None => println!("unassigned"),
            }
        }
        NodeCommands::SetRole {
            identity,
            role,
            actor,
        } => {
            let record = resolver
                .set_role(&parse_key(&identity)?, role.into(), &parse_key(&actor)?)
                .await?;
            println!("{}", record.id);
        }
        NodeCommands::RevokeRole { identity, actor } => {
            let removed = resolver
                .revoke_role(&parse_key(&identity)?, &parse_key(&actor)?)
                .await?;
            println!("removed {} record(s)", removed.len());
        }
        NodeCommands::AddOpenRule { access, actor } => {
            let record = resolver
                .add_rule(
                    access.into_iter().map(AccessType::from),
                    AccessCondition::Any,
                    &parse_key(&actor)?,
                )
                .await?;
            println!("{}", record.id);
        }
        NodeCommands::CanRead { identity } => {
            println!("{}", resolver.can_read(&parse_key(&identity)?).await);
        }
        NodeCommands::CanWrite { signers } => {
            let signers = signers
                .iter()
                .map(|s| parse_key(s))
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", resolver.can_perform(&signers).await);
        }
        NodeCommands::List => {
            for record in resolver.list_policies().await? {
                println!("{}", serde_json::to_string(&record)?);
            }
        }
    }

    node.close();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Cli { config, command } = Cli::parse();

    match command {
        Commands::Keygen => {
            keygen();
            Ok(())
        }
        Commands::Node(command) => run_node_command(config.as_deref(), command).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_keygen_needs_no_node() {
        let cli = Cli::try_parse_from(["datafold_acl", "keygen"]).unwrap();
        assert!(matches!(cli.command, Commands::Keygen));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_node_commands_are_flattened() {
        let cli = Cli::try_parse_from([
            "datafold_acl",
            "--config",
            "acl.toml",
            "can-write",
            "--signer",
            "a",
            "--signer",
            "b",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some("acl.toml"));
        match cli.command {
            Commands::Node(NodeCommands::CanWrite { signers }) => assert_eq!(signers, ["a", "b"]),
            _ => panic!("expected can-write"),
        }

        let cli = Cli::try_parse_from([
            "datafold_acl",
            "set-role",
            "--identity",
            "k",
            "--role",
            "writer",
            "--actor",
            "a",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Node(NodeCommands::SetRole { role: CliRole::Writer, .. })
        ));
    }
}
