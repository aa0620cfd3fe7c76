pub(crate) mod youtube;

pub(crate) use youtube::{YoutubeClient, YoutubeConfig};
