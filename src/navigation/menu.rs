//! Navigation menu tree

use crate::api::{MenuRow, TrytonApi};
use crate::error::Result;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct MenuNode {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
    /// Model opened by the entry's window action, when it has one
    pub res_model: Option<String>,
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn find(&self, id: i64) -> Option<&MenuNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Assemble `ir.ui.menu` rows into a forest. Rows whose parent is not
/// visible to the user become roots. `action_models` maps window action ids
/// to the model they open.
pub fn build_menu_tree(rows: &[MenuRow], action_models: &HashMap<i64, String>) -> Vec<MenuNode> {
    let known: HashSet<i64> = rows.iter().map(|r| r.id).collect();
    let mut ordered: Vec<&MenuRow> = rows.iter().collect();
    ordered.sort_by_key(|r| (r.sequence.unwrap_or(0), r.id));

    let mut children: HashMap<Option<i64>, Vec<&MenuRow>> = HashMap::new();
    for row in ordered {
        let parent = row.parent.filter(|p| known.contains(p) && *p != row.id);
        children.entry(parent).or_default().push(row);
    }

    let mut placed = HashSet::new();
    let roots = assemble(None, &children, action_models, &mut placed);
    if placed.len() < rows.len() {
        warn!("{} menu entries are part of a parent cycle and were skipped", rows.len() - placed.len());
    }
    debug!("Built menu with {} roots from {} rows", roots.len(), rows.len());
    roots
}

fn assemble(
    parent: Option<i64>,
    children: &HashMap<Option<i64>, Vec<&MenuRow>>,
    action_models: &HashMap<i64, String>,
    placed: &mut HashSet<i64>,
) -> Vec<MenuNode> {
    let Some(rows) = children.get(&parent) else {
        return Vec::new();
    };
    let mut nodes = Vec::with_capacity(rows.len());
    for row in rows {
        if !placed.insert(row.id) {
            continue;
        }
        nodes.push(MenuNode {
            id: row.id,
            name: row.name.clone(),
            icon: row.icon.clone(),
            res_model: row.window_action_id().and_then(|id| action_models.get(&id).cloned()),
            children: assemble(Some(row.id), children, action_models, placed),
        });
    }
    nodes
}

/// Fetch the menu rows and the models their actions open
pub async fn load_menu(api: &dyn TrytonApi) -> Result<Vec<MenuNode>> {
    let rows = api.menu_rows().await?;
    let action_ids: Vec<i64> = rows.iter().filter_map(MenuRow::window_action_id).collect();
    let action_models = api.window_action_models(&action_ids).await?;
    Ok(build_menu_tree(&rows, &action_models))
}

/// The menu forest plus which entries are expanded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuState {
    pub roots: Vec<MenuNode>,
    expanded: HashSet<i64>,
}

impl MenuState {
    pub fn new(roots: Vec<MenuNode>) -> Self {
        Self {
            roots,
            expanded: HashSet::new(),
        }
    }

    pub fn find(&self, id: i64) -> Option<&MenuNode> {
        self.roots.iter().find_map(|root| root.find(id))
    }

    pub fn is_expanded(&self, id: i64) -> bool {
        self.expanded.contains(&id)
    }

    /// Flip an entry open or closed; returns the new state
    pub fn toggle(&mut self, id: i64) -> bool {
        if self.expanded.remove(&id) {
            false
        } else {
            self.expanded.insert(id);
            true
        }
    }

    /// Entries currently on screen with their depth, in display order
    pub fn visible(&self) -> Vec<(usize, &MenuNode)> {
        let mut out = Vec::new();
        for root in &self.roots {
            self.walk(root, 0, &mut out);
        }
        out
    }

    fn walk<'a>(&'a self, node: &'a MenuNode, depth: usize, out: &mut Vec<(usize, &'a MenuNode)>) {
        out.push((depth, node));
        if self.is_expanded(node.id) {
            for child in &node.children {
                self.walk(child, depth + 1, out);
            }
        }
    }

    pub fn clear(&mut self) {
        self.roots.clear();
        self.expanded.clear();
    }
}
