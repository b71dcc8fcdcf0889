//! karc - research consortium portal

use anyhow::Result;
use clap::Parser;

use karc_cli::cli::commands::{
    admin_seed, run_activity, run_announcements, run_blog, run_comments_add,
    run_comments_delete, run_comments_list, run_init, run_login, run_logout, run_members_approve,
    run_members_list, run_members_reject, run_members_revoke, run_members_role,
    run_profile_show, run_profile_update, run_reports, run_researchers_list, run_signup,
    run_stats, run_variants_add, run_variants_bulk_delete, run_variants_delete,
    run_variants_edit, run_variants_import, run_variants_list, run_variants_show, run_whoami,
};
use karc_cli::cli::{
    AuthCommands, Cli, Commands, CommentsCommands, MembersCommands, ProfileCommands,
    ResearchersCommands, VariantsCommands,
};
use karc_cli::output::OutputFormat;
use karc_cli::telemetry;

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_format)?;

    let data_dir = cli.data_dir.as_deref();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Commands::Init {
            admin_email,
            admin_password,
            admin_name,
        } => {
            let seed = admin_seed(
                admin_email.as_deref(),
                admin_password.as_deref(),
                admin_name.as_deref(),
            )?;
            run_init(data_dir, seed, format)?;
        }

        Commands::Auth(cmd) => match cmd {
            AuthCommands::Signup {
                email,
                password,
                full_name,
                institution,
            } => {
                run_signup(
                    data_dir,
                    &email,
                    &password,
                    full_name.as_deref(),
                    institution.as_deref(),
                    format,
                )?;
            }
            AuthCommands::Login { email, password } => {
                run_login(data_dir, &email, &password, format)?;
            }
            AuthCommands::Logout => {
                run_logout(data_dir, format)?;
            }
            AuthCommands::Whoami => {
                run_whoami(data_dir, format)?;
            }
        },

        Commands::Variants(cmd) => match cmd {
            VariantsCommands::List { list } => {
                run_variants_list(data_dir, &list, format)?;
            }
            VariantsCommands::Show { id } => {
                run_variants_show(data_dir, &id, format)?;
            }
            VariantsCommands::Add {
                gene,
                variant,
                fields,
            } => {
                run_variants_add(data_dir, &gene, &variant, fields, format)?;
            }
            VariantsCommands::Edit {
                id,
                gene,
                variant,
                fields,
            } => {
                run_variants_edit(
                    data_dir,
                    &id,
                    gene.as_deref(),
                    variant.as_deref(),
                    fields,
                    format,
                )?;
            }
            VariantsCommands::Delete { id, confirm } => {
                run_variants_delete(data_dir, &id, confirm, format)?;
            }
            VariantsCommands::BulkDelete { ids, confirm } => {
                run_variants_bulk_delete(data_dir, &ids, confirm, format)?;
            }
            VariantsCommands::Import { file, schema } => {
                run_variants_import(data_dir, &file, schema, format)?;
            }
        },

        Commands::Comments(cmd) => match cmd {
            CommentsCommands::List { variant_id } => {
                run_comments_list(data_dir, &variant_id, format)?;
            }
            CommentsCommands::Add {
                variant_id,
                message,
                message_positional,
            } => {
                let text = message.or(message_positional);
                run_comments_add(data_dir, &variant_id, text.as_deref(), format)?;
            }
            CommentsCommands::Delete {
                comment_id,
                confirm,
            } => {
                run_comments_delete(data_dir, &comment_id, confirm, format)?;
            }
        },

        Commands::Members(cmd) => match cmd {
            MembersCommands::List { pending, list } => {
                run_members_list(data_dir, pending, &list, format)?;
            }
            MembersCommands::Approve { member_id } => {
                run_members_approve(data_dir, &member_id, format)?;
            }
            MembersCommands::Revoke { member_id } => {
                run_members_revoke(data_dir, &member_id, format)?;
            }
            MembersCommands::Reject { member_id, confirm } => {
                run_members_reject(data_dir, &member_id, confirm, format)?;
            }
            MembersCommands::Role { member_id, role } => {
                run_members_role(data_dir, &member_id, role, format)?;
            }
        },

        Commands::Researchers(ResearchersCommands::List { list }) => {
            run_researchers_list(data_dir, &list, format)?;
        }

        Commands::Profile(cmd) => match cmd {
            ProfileCommands::Show => {
                run_profile_show(data_dir, format)?;
            }
            ProfileCommands::Update {
                full_name,
                institution,
                expertise,
            } => {
                run_profile_update(
                    data_dir,
                    full_name.as_deref(),
                    institution.as_deref(),
                    expertise.as_deref(),
                    format,
                )?;
            }
        },

        Commands::Activity { limit } => {
            run_activity(data_dir, limit, format)?;
        }

        Commands::Reports(cmd) => {
            run_reports(data_dir, cmd, format)?;
        }

        Commands::Announcements(cmd) => {
            run_announcements(data_dir, cmd, format)?;
        }

        Commands::Blog(cmd) => {
            run_blog(data_dir, cmd, format)?;
        }

        Commands::Stats => {
            run_stats(data_dir, format)?;
        }
    }

    Ok(())
}
