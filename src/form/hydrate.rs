//! Asynchronous completion of an open form
//!
//! Everything here talks to the server and writes the answers back into a
//! [`FormSession`]: selection options from server methods, display names of
//! many2one values that arrived as bare ids, display names of many2many
//! members and server-side defaults for new records.

use super::session::FormSession;
use crate::api::TrytonApi;
use crate::error::Result;
use crate::fields::PendingLookup;
use crate::view::ViewArchitecture;
use futures::future::join_all;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Call every unresolved selection method of the form concurrently. Options
/// that arrive are stored even when another call fails; the first failure is
/// returned.
pub async fn resolve_selections(api: &dyn TrytonApi, session: &mut FormSession) -> Result<()> {
    let unresolved = session.unresolved_selections();
    if unresolved.is_empty() {
        return Ok(());
    }

    let model = session.model().to_string();
    let calls = unresolved
        .iter()
        .map(|(_, method)| api.resolve_selection_options(&model, method));
    let results = join_all(calls).await;

    let mut first_error = None;
    for ((field, method), result) in unresolved.into_iter().zip(results) {
        match result {
            Ok(options) => {
                debug!("Resolved {} options for '{}' via {}", options.len(), field, method);
                session.set_selection_options(&field, options);
            }
            Err(e) => {
                warn!("Selection method {}.{} failed: {}", model, method, e);
                first_error.get_or_insert(e);
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Fetch display names for every queued many2one lookup, one read per
/// related model. Failed lookups stay queued.
pub async fn resolve_pending_references(api: &dyn TrytonApi, session: &mut FormSession) -> Result<()> {
    let lookups = session.take_pending_lookups();
    if lookups.is_empty() {
        return Ok(());
    }

    let mut by_model: BTreeMap<String, Vec<PendingLookup>> = BTreeMap::new();
    for lookup in lookups {
        by_model.entry(lookup.model.clone()).or_default().push(lookup);
    }

    let calls = by_model.iter().map(|(model, group)| {
        let mut ids: Vec<i64> = group.iter().map(|l| l.id).collect();
        ids.sort_unstable();
        ids.dedup();
        async move { api.read_display_names(model, &ids).await }
    });
    let results = join_all(calls).await;

    let mut first_error = None;
    for ((model, group), result) in by_model.into_iter().zip(results) {
        match result {
            Ok(names) => {
                for lookup in group {
                    match names.iter().find(|r| r.id == lookup.id) {
                        Some(reference) => {
                            session.resolve_reference(&lookup.field, reference.clone());
                        }
                        None => warn!("No display name for {} #{}", model, lookup.id),
                    }
                }
            }
            Err(e) => {
                warn!("Display name lookup on '{}' failed: {}", model, e);
                session.requeue_lookups(group);
                first_error.get_or_insert(e);
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Cache display names of many2many members, `page_size` ids per request
pub async fn load_many2many_names(
    api: &dyn TrytonApi,
    session: &mut FormSession,
    page_size: usize,
) -> Result<()> {
    let page_size = page_size.max(1);
    for (field, model, ids) in session.unloaded_relations() {
        for page in ids.chunks(page_size) {
            let names = api.read_display_names(&model, page).await?;
            debug!("Loaded {} names for '{}'", names.len(), field);
            session.cache_relation_names(&field, names);
        }
    }
    Ok(())
}

/// Server defaults for a new record of this view
pub async fn load_defaults(api: &dyn TrytonApi, architecture: &ViewArchitecture) -> Result<Map<String, Value>> {
    let fields: Vec<String> = architecture
        .field_names()
        .filter(|name| !name.contains('.'))
        .map(str::to_string)
        .collect();
    api.default_values(&architecture.model, &fields).await
}

/// Run every hydration step. Each step runs even if an earlier one failed;
/// the first failure is returned so the form can show a retry affordance.
pub async fn hydrate(api: &dyn TrytonApi, session: &mut FormSession, page_size: usize) -> Result<()> {
    let selections = resolve_selections(api, session).await;
    let references = resolve_pending_references(api, session).await;
    let relations = load_many2many_names(api, session, page_size).await;
    selections.and(references).and(relations)
}
