//! Shared fixtures for engine scenario tests.

#![allow(dead_code)]

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use ob_bake::png::write_chunk;
use ob_bake::PNG_SIGNATURE;
use ob_core::{AchievementId, IssuerId};
use ob_engine::{AuthContext, CredentialEngine, EngineConfig, NewAchievement, NewIssuer};

pub struct World {
    pub engine: CredentialEngine,
    pub admin: AuthContext,
    pub issuer: IssuerId,
    pub achievement: AchievementId,
}

pub fn world() -> World {
    world_with(EngineConfig {
        host_base_url: "https://badges.example.org".into(),
        ..EngineConfig::default()
    })
}

pub fn world_with(config: EngineConfig) -> World {
    let engine = CredentialEngine::in_memory(config).unwrap();
    let admin = AuthContext::service("registrar@example.org");
    let issuer = engine
        .register_issuer(
            &admin,
            NewIssuer {
                name: "Example University".into(),
                url: "https://university.example".into(),
                email: Some("registrar@university.example".into()),
                description: Some("Awards badges in tests.".into()),
                image: None,
            },
        )
        .unwrap()
        .issuer
        .id;
    let achievement = engine
        .register_achievement(
            &admin,
            NewAchievement {
                issuer_id: issuer,
                name: "Test Badge".into(),
                description: "Awarded for passing the test.".into(),
                image: Some("https://university.example/badge.png".into()),
                criteria_narrative: "Pass the test.".into(),
                criteria_url: None,
                alignments: Vec::new(),
                tags: vec!["testing".into()],
            },
        )
        .unwrap()
        .id;
    World {
        engine,
        admin,
        issuer,
        achievement,
    }
}

/// A valid 1x1 RGBA PNG with no badge.
pub fn one_pixel_png() -> Vec<u8> {
    let mut out = PNG_SIGNATURE.to_vec();
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);
    write_chunk(&mut out, b"IHDR", &ihdr).unwrap();
    let mut z = ZlibEncoder::new(Vec::new(), Compression::default());
    z.write_all(&[0, 0x33, 0x66, 0x99, 0xff]).unwrap();
    write_chunk(&mut out, b"IDAT", &z.finish().unwrap()).unwrap();
    write_chunk(&mut out, b"IEND", &[]).unwrap();
    out
}

pub const ONE_PIXEL_SVG: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="1" height="1"><rect width="1" height="1" fill="#369"/></svg>"##;
