//! Provider-independent access to Twitter/X data.
//!
//! Only the Twitter/X pipeline exists today; see [`twitter`].
pub mod twitter;
