//! Human-readable descriptions for document store error codes.
//!
//! Used to enrich error notifications only; control flow never depends on it.

use crate::errors::HResult;
use once_cell::sync::Lazy;
use std::collections::HashMap;

static ERROR_CODE_TABLE: Lazy<HashMap<HResult, &'static str>> = Lazy::new(|| {
    [
        (-2147213312, "The XML is not well-formed."),
        (-2147213311, "The XML is invalid."),
        (-2147213310, "The section could not be created."),
        (-2147213309, "The section could not be opened."),
        (-2147213308, "The section does not exist."),
        (-2147213307, "The page does not exist."),
        (-2147213306, "The file does not exist."),
        (-2147213305, "The image could not be inserted."),
        (-2147213304, "The ink could not be inserted."),
        (-2147213303, "The HTML could not be inserted."),
        (-2147213302, "The page could not be opened."),
        (-2147213301, "The section is read-only."),
        (-2147213300, "The page is read-only."),
        (-2147213299, "The outline text could not be inserted."),
        (-2147213298, "The page object does not exist."),
        (-2147213297, "The binary object does not exist."),
        (-2147213296, "The last modified date does not match."),
        (-2147213295, "The section group does not exist."),
        (-2147213294, "The page does not exist in the section group."),
        (-2147213293, "There is no active selection."),
        (-2147213292, "The object does not exist."),
        (-2147213291, "The notebook does not exist."),
        (-2147213290, "The file could not be inserted."),
        (-2147213289, "The name is invalid."),
        (-2147213288, "The folder (section group) does not exist."),
        (-2147213287, "The query is invalid."),
        (-2147213286, "The file already exists."),
        (-2147213285, "The section is encrypted and locked."),
        (-2147213284, "The action is disabled by a policy."),
        (-2147213283, "The notebook has not yet synchronized content."),
        (-2147213282, "The section is from an unsupported earlier version."),
        (-2147213281, "The merge operation failed."),
        (-2147213280, "The XML Schema is invalid."),
        (-2147213278, "Content loss has occurred (from future versions)."),
        (-2147213277, "The action timed out."),
        (-2147213276, "Audio recording is in progress."),
        (-2147213275, "The linked-note state is unknown."),
        (-2147213274, "No short name exists for the linked note."),
        (-2147213273, "No friendly name exists for the linked note."),
        (-2147213272, "The linked note URI is invalid."),
        (-2147213271, "The linked note thumbnail is invalid."),
        (-2147213270, "The importation of linked note thumbnail failed."),
        (-2147213269, "Unread highlighting is disabled for the notebook."),
        (-2147213268, "The selection is invalid."),
        (-2147213267, "The conversion failed."),
        (-2147213266, "Edit failed in the Recycle Bin."),
        (-2147213264, "A modal dialog is blocking the app."),
    ]
    .into_iter()
    .collect()
});

/// Builds the table eagerly. Call once at startup so the first failure
/// report does not pay for it.
pub fn init() {
    Lazy::force(&ERROR_CODE_TABLE);
}

pub fn describe(code: HResult) -> Option<&'static str> {
    ERROR_CODE_TABLE.get(&code).copied()
}

pub fn is_store_error_code(code: HResult) -> bool {
    ERROR_CODE_TABLE.contains_key(&code)
}
