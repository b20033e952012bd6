//! Folder hierarchy CLI commands.
//!
//! These talk to the PostgreSQL store directly and skip access checks.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use folderhub_core::config::AppConfig;
use folderhub_core::error::AppError;
use folderhub_database::store::FolderStore;
use folderhub_database::ClosureMaintainer;
use folderhub_entity::folder::{CreateFolder, Folder, FolderNode};

/// Arguments for folder commands
#[derive(Debug, Args)]
pub struct FolderArgs {
    /// Folder subcommand
    #[command(subcommand)]
    pub command: FolderCommand,
}

/// Folder subcommands
#[derive(Debug, Subcommand)]
pub enum FolderCommand {
    /// Create a new folder
    Create {
        /// Owner user ID
        #[arg(short, long)]
        owner_id: Uuid,
        /// Folder name
        #[arg(short, long)]
        name: String,
        /// Parent folder ID (omit for root)
        #[arg(short, long)]
        parent_id: Option<Uuid>,
        /// Folder description
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Move a folder under a new parent
    Move {
        /// Folder ID
        id: Uuid,
        /// New parent folder ID (omit to make it a root)
        #[arg(short, long)]
        parent_id: Option<Uuid>,
    },
    /// Delete a folder and everything below it
    Delete {
        /// Folder ID
        id: Uuid,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// List root folders of an owner
    Roots {
        /// Owner user ID
        #[arg(short, long)]
        owner_id: Uuid,
    },
    /// List direct subfolders
    Children {
        /// Folder ID
        id: Uuid,
        /// List only what this user can see (defaults to the folder owner)
        #[arg(short, long)]
        viewer_id: Option<Uuid>,
    },
    /// Show the breadcrumb from the root down to the folder's parent
    Ancestors {
        /// Folder ID
        id: Uuid,
    },
    /// List every folder below a folder
    Descendants {
        /// Folder ID
        id: Uuid,
    },
    /// Show the subtree rooted at a folder
    Tree {
        /// Folder ID
        id: Uuid,
    },
}

/// Folder display row
#[derive(Debug, Serialize, Tabled)]
struct FolderRow {
    /// Folder ID
    id: String,
    /// Name
    name: String,
    /// Parent ID
    parent_id: String,
    /// Owner ID
    owner_id: String,
    /// Created at
    created_at: String,
}

impl From<&Folder> for FolderRow {
    fn from(f: &Folder) -> Self {
        Self {
            id: f.id.to_string(),
            name: f.name.clone(),
            parent_id: f.parent_id.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
            owner_id: f.owner_id.to_string(),
            created_at: f.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute folder commands
pub async fn execute(
    args: &FolderArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let db = super::create_db_pool(config).await?;
    let folders = db.folders();
    let maintainer = ClosureMaintainer::new(Arc::new(folders.clone()), &config.store);

    match &args.command {
        FolderCommand::Create {
            owner_id,
            name,
            parent_id,
            description,
        } => {
            let data = CreateFolder {
                owner_id: *owner_id,
                name: name.clone(),
                description: description.clone(),
                parent_id: *parent_id,
                asset_order: Default::default(),
            };
            let folder = maintainer.create_folder(&data).await?;
            output::print_success(&format!("Folder '{}' created (id: {})", folder.name, folder.id));
        }
        FolderCommand::Move { id, parent_id } => {
            let folder = maintainer.move_folder(*id, *parent_id).await?;
            let target = parent_id.map(|p| p.to_string()).unwrap_or_else(|| "root".to_string());
            output::print_success(&format!("Folder '{}' moved to {target}", folder.name));
        }
        FolderCommand::Delete { id, force } => {
            let folder = require(&folders, *id).await?;
            let below = folders.find_descendants(*id).await?.len();

            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Delete '{}' and {below} subfolder(s)? This cannot be undone.",
                        folder.name
                    ))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    db.close().await;
                    return Ok(());
                }
            }

            if maintainer.delete_folder(*id).await? {
                output::print_success(&format!("Folder '{}' deleted", folder.name));
            } else {
                output::print_warning("Folder was already gone");
            }
        }
        FolderCommand::Roots { owner_id } => {
            let roots = folders.find_roots(*owner_id).await?;
            print_folders(&roots, format);
        }
        FolderCommand::Children { id, viewer_id } => {
            let viewer_id = match viewer_id {
                Some(viewer_id) => *viewer_id,
                None => require(&folders, *id).await?.owner_id,
            };
            let children = folders.find_children(viewer_id, *id).await?;
            print_folders(&children, format);
        }
        FolderCommand::Ancestors { id } => {
            require(&folders, *id).await?;
            let ancestors = folders.find_ancestors(*id).await?;
            print_folders(&ancestors, format);
        }
        FolderCommand::Descendants { id } => {
            require(&folders, *id).await?;
            let descendants = folders.find_descendants(*id).await?;
            print_folders(&descendants, format);
        }
        FolderCommand::Tree { id } => {
            let root = require(&folders, *id).await?;
            let descendants = folders.find_descendants(*id).await?;
            let tree = FolderNode::build(&root, &descendants);
            match format {
                OutputFormat::Table => print!("{}", render_tree(&tree)),
                OutputFormat::Json => output::print_json(&tree),
            }
        }
    }

    db.close().await;
    Ok(())
}

async fn require(folders: &dyn FolderStore, id: Uuid) -> Result<Folder, AppError> {
    folders
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))
}

fn print_folders(folders: &[Folder], format: OutputFormat) {
    let rows: Vec<FolderRow> = folders.iter().map(FolderRow::from).collect();
    output::print_list(&rows, format);
}

/// Render a subtree with box-drawing connectors, one folder per line.
fn render_tree(root: &FolderNode) -> String {
    let mut out = format!("{}/\n", root.name);
    render_children(root, "", &mut out);
    out
}

fn render_children(node: &FolderNode, prefix: &str, out: &mut String) {
    let last = node.children.len().saturating_sub(1);
    for (i, child) in node.children.iter().enumerate() {
        let (branch, indent) = if i == last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        out.push_str(&format!("{prefix}{branch}{}/\n", child.name));
        render_children(child, &format!("{prefix}{indent}"), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, children: Vec<FolderNode>) -> FolderNode {
        FolderNode {
            id: Uuid::new_v4(),
            name: name.to_string(),
            depth: 0,
            child_count: children.len() as u64,
            children,
        }
    }

    #[test]
    fn test_render_tree() {
        let tree = node(
            "2024",
            vec![
                node("Japan", vec![node("Day 1", vec![])]),
                node("Norway", vec![]),
            ],
        );
        assert_eq!(
            render_tree(&tree),
            "2024/\n├── Japan/\n│   └── Day 1/\n└── Norway/\n"
        );
    }
}
