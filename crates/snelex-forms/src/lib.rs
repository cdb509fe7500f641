//! # snelex-forms — Form Host
//!
//! The explicit event surface of the freight forms. A [`FormHost`] owns
//! the synchronization engine and the transition guard, built from one
//! injected [`RuleBook`](snelex_rules::RuleBook), and exposes the events a
//! UI raises:
//!
//! | Event | Method |
//! |---|---|
//! | form opened / reloaded | [`FormHost::open`], [`FormHost::refresh`] |
//! | field edited | [`FormHost::field_changed`] |
//! | document saved | [`FormHost::save`] |
//! | submit pressed | [`FormHost::before_submit`], [`FormHost::submit`] |
//! | cancel pressed | [`FormHost::cancel`] |
//! | source picked for a linked document | [`FormHost::select_source`] |
//! | "create" from the source document | [`FormHost::create_from_source`] |
//! | "get details" button | [`FormHost::pull`] |

pub mod actions;
pub mod companion;
pub mod error;
pub mod host;

pub use actions::LinkOutcome;
pub use error::FormError;
pub use host::FormHost;
