/// Max length of a building, floor, or room name.
pub const MAX_LOCATION_FIELD_LEN: usize = 64;

/// Max length of a requester id.
pub const MAX_REQUESTER_LEN: usize = 64;

/// Max length of free text: title, description, purpose, cancellation reason.
pub const MAX_TEXT_LEN: usize = 1024;

/// Max entries in the accompanying-students list.
pub const MAX_ACCOMPANYING: usize = 64;

/// Max bytes in one newline-delimited JSON request.
pub const MAX_REQUEST_LINE_LEN: usize = 64 * 1024;

/// Max length of a lecture id.
pub const MAX_LECTURE_ID_LEN: usize = 64;
