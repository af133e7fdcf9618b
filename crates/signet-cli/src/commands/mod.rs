//! CLI subcommand implementations, one module per command area.

use clap::Args;

use signet_core::Actor;

pub mod activity;
pub mod checklist;
pub mod config;
pub mod document;
pub mod form;
pub mod resolve;

// ---------------------------------------------------------------------------
// ActorArgs
// ---------------------------------------------------------------------------

/// Identity of the acting user, shared by every mutating command.
///
/// Signet trusts this identity as given; in a deployment the wrapper script
/// or session layer is responsible for providing truthful values.
#[derive(Debug, Args)]
pub struct ActorArgs {
    /// Acting user id.
    #[arg(long = "user", env = "SIGNET_USER", value_name = "ID")]
    pub user_id: String,

    /// Acting user display name (defaults to the user id).
    #[arg(long, env = "SIGNET_USER_NAME", value_name = "NAME")]
    pub user_name: Option<String>,

    /// Acting user position/title.
    #[arg(long, env = "SIGNET_POSITION", value_name = "TITLE")]
    pub position: Option<String>,

    /// Reference to a stored signature image.
    #[arg(long, value_name = "PATH")]
    pub signature_image: Option<String>,
}

impl ActorArgs {
    /// Builds the engine-facing identity.
    #[must_use]
    pub fn to_actor(&self) -> Actor {
        Actor {
            user_id: self.user_id.clone(),
            user_name: self
                .user_name
                .clone()
                .unwrap_or_else(|| self.user_id.clone()),
            position: self.position.clone().unwrap_or_else(|| "Staff".to_string()),
            signature_image: self.signature_image.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_defaults_fill_in() {
        let args = ActorArgs {
            user_id: "u-1".to_string(),
            user_name: None,
            position: None,
            signature_image: None,
        };
        let actor = args.to_actor();
        assert_eq!(actor.user_name, "u-1");
        assert_eq!(actor.position, "Staff");
        assert!(actor.signature_image.is_none());
    }
}
