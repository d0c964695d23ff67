//! Merge the cells of a text file with the outputs of its `.ipynb` pair.

use nbpair_core::{Cell, Notebook};
use nbpair_formats::cells::VOLATILE_CELL_METADATA;
use nbpair_formats::header::HEADER_METADATA_KEYS;

/// Key whose presence follows the text file exactly: removing the pairing
/// from a text header removes it from the notebook too.
const PAIRING_KEY: &str = nbpair_core::types::PAIRING_KEY;

/// Cells of `text_nb`, decorated with the outputs, execution counts, ids and
/// volatile metadata of the matching cells of `ipynb_nb`.
///
/// Each text cell is matched with the next unused `.ipynb` cell of the same
/// type and source, searching forward first and then from the top, so
/// inserted, deleted and moved cells keep their outputs.
pub fn combine_inputs_with_outputs(text_nb: &Notebook, ipynb_nb: &Notebook) -> Notebook {
    let mut used = vec![false; ipynb_nb.cells.len()];
    let mut cursor = 0;
    let mut cells = Vec::with_capacity(text_nb.cells.len());

    for cell in &text_nb.cells {
        let matches = |j: &usize| {
            let other = &ipynb_nb.cells[*j];
            !used[*j] && other.cell_type == cell.cell_type && other.source == cell.source
        };
        let found = (cursor..ipynb_nb.cells.len())
            .find(|j| matches(j))
            .or_else(|| (0..cursor).find(|j| matches(j)));

        let combined = match found {
            Some(j) => {
                used[j] = true;
                cursor = j + 1;
                merge_cell(cell, &ipynb_nb.cells[j])
            }
            None => cell.clone(),
        };
        cells.push(combined);
    }

    let unmatched = used.iter().filter(|u| !**u).count();
    if unmatched > 0 {
        tracing::debug!("{unmatched} notebook cell(s) dropped by the text version");
    }

    let mut metadata = ipynb_nb.metadata.clone();
    for key in HEADER_METADATA_KEYS {
        match text_nb.metadata.get(*key) {
            Some(value) => {
                metadata.insert(key.to_string(), value.clone());
            }
            None if *key == PAIRING_KEY => {
                metadata.remove(*key);
            }
            None => {}
        }
    }
    for (key, value) in &text_nb.metadata {
        if !metadata.contains_key(key) {
            metadata.insert(key.clone(), value.clone());
        }
    }

    Notebook {
        nbformat: ipynb_nb.nbformat,
        nbformat_minor: ipynb_nb.nbformat_minor,
        metadata,
        cells,
    }
}

fn merge_cell(text: &Cell, ipynb: &Cell) -> Cell {
    let mut cell = text.clone();
    cell.outputs = ipynb.outputs.clone();
    cell.execution_count = ipynb.execution_count;
    cell.id = ipynb.id.clone().or(cell.id);
    cell.attachments = ipynb.attachments.clone().or(cell.attachments);
    for key in VOLATILE_CELL_METADATA {
        if let Some(value) = ipynb.metadata.get(*key) {
            cell.metadata.insert(key.to_string(), value.clone());
        }
    }
    cell
}
