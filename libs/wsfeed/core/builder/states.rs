/// Type-state markers for the session builder
///
/// These types track which required fields have been set at compile time,
/// so a session without a URL or without a frame handler cannot be spawned.
use std::marker::PhantomData;

/// Marker trait for URL state
pub trait UrlState {}

/// URL has not been set
pub struct NoUrl;
impl UrlState for NoUrl {}

/// URL has been set
pub struct HasUrl;
impl UrlState for HasUrl {}

/// Marker trait for handler state
pub trait HandlerState {}

/// Handler has not been set
pub struct NoHandler;
impl HandlerState for NoHandler {}

/// Handler has been set
pub struct HasHandler;
impl HandlerState for HasHandler {}

/// Phantom marker to prevent direct construction
#[derive(Debug, Clone, Copy)]
pub struct TypeState<U, H> {
    _url: PhantomData<U>,
    _handler: PhantomData<H>,
}

impl<U, H> TypeState<U, H> {
    pub(crate) fn new() -> Self {
        Self {
            _url: PhantomData,
            _handler: PhantomData,
        }
    }
}

impl<U, H> Default for TypeState<U, H> {
    fn default() -> Self {
        Self::new()
    }
}
