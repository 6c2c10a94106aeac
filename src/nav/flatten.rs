use crate::engine::profile::profile;
use crate::nav::keys::{entity_key, record_key};
use crate::ui::{AppState, FlatNode};

/// Entities plus, for expanded ones, a "+ New" row and the loaded records.
pub fn flatten_nodes(state: &AppState) -> Vec<FlatNode> {
    let mut out = Vec::new();
    for (i, e) in state.config.entities.iter().enumerate() {
        out.push(FlatNode::Entity { idx: i });
        let key = entity_key(e);
        if !state.expanded.contains(&key) {
            continue;
        }
        if e.create_cmd.is_some() {
            out.push(FlatNode::New { idx: i, depth: 1 });
        }
        if let Some(records) = state.children.get(&key) {
            let id_key = profile(e.kind).id_key;
            for (ri, val) in records.iter().enumerate() {
                out.push(FlatNode::Record {
                    idx: i,
                    key: record_key(&key, val, id_key, ri),
                    depth: 1,
                    val: val.clone(),
                });
            }
        }
    }
    out
}
