//! Base types and error handling.
//!
//! Provides foundational types mirroring Chromium's `net/base/`:
//! - [`NetError`](neterror::NetError): Network error codes matching `net_error_list.h`
//! - [`LoadState`](loadstate::LoadState): Request loading states from `load_states_list.h`
//! - [`LoadFlags`](loadflags::LoadFlags), [`RequestPriority`](priority::RequestPriority)
//! - Origin identity: [`HostPortPair`](hostportpair::HostPortPair),
//!   [`SchemeHostPort`](hostportpair::SchemeHostPort),
//!   [`NetworkAnonymizationKey`](networkkey::NetworkAnonymizationKey)

pub mod hostportpair;
pub mod loadflags;
pub mod loadstate;
pub mod loadtiming;
pub mod neterror;
pub mod networkkey;
pub mod priority;
pub mod transportinfo;
