//! Serialization codec for torrent descriptors and resume records.

pub mod bencode;
