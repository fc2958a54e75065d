//! Asset module: best-effort image downloads with candidate fallback,
//! a freshness cache, and a minimum-size floor

mod fetcher;

pub use fetcher::AssetFetcher;
