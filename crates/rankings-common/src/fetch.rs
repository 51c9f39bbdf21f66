/// The image-fetch seam used by `reconcile::fill_missing_fighter_images` and
/// `reconcile::fill_images_by_name`.
///
/// Implementations decide how a profile link or a fighter name turns into an
/// image URL (network, cache, fixtures). The reconciler only awaits one call
/// at a time.
use futures::future::BoxFuture;

use crate::error::CommonError;

pub trait ImageFetcher {
    /// `Ok(None)` means the profile was reachable but had no usable image.
    fn fetch_image<'a>(&'a self, link: &'a str) -> BoxFuture<'a, Result<Option<String>, CommonError>>;

    /// Look a fighter up by display name. Sources without a search answer
    /// `Ok(None)`.
    fn search_image<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>, CommonError>> {
        let _ = name;
        Box::pin(async { Ok(None) })
    }
}
