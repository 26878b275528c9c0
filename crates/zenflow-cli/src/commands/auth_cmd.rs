use crate::auth::{clear_stored_session, load_stored_session, SupabaseAuthService};
use crate::cli::AuthCommands;
use crate::commands::common::ProfileContext;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let profile = ProfileContext::load(global_profile)?;
    match command {
        AuthCommands::Login { email, password } => {
            let auth_service = profile.auth_service()?;
            let session = auth_service.sign_in(&email, &password).await?;
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            println!("Signed in profile '{}' as {email_label}", profile.name);
            if !profile.sync.cloud_sync_enabled {
                println!("Cloud sync is off. Run `zenflow config init --enable-sync` to turn it on.");
            }
            Ok(())
        }
        AuthCommands::Status => {
            let session = match SupabaseAuthService::new_for_profile(&profile.name, &profile.sync)? {
                Some(service) => service.restore_session().await?,
                None => load_stored_session(&profile.name)?,
            };

            if let Some(session) = session {
                let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                println!(
                    "Profile '{}' is signed in as {} (expires_at={})",
                    profile.name, email_label, session.expires_at
                );
            } else {
                println!("Profile '{}' is not signed in.", profile.name);
            }
            Ok(())
        }
        AuthCommands::Logout => {
            let stored_session = load_stored_session(&profile.name)?;
            let service = SupabaseAuthService::new_for_profile(&profile.name, &profile.sync)?;

            if let (Some(service), Some(session)) = (service, stored_session) {
                service.sign_out(&session.access_token).await?;
            } else {
                clear_stored_session(&profile.name)?;
            }

            println!("Signed out profile '{}'", profile.name);
            Ok(())
        }
    }
}
