extern crate alive_data;

mod common;

use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use alive_data::prelude::*;

use self::common::*;

const RESOURCES: &str = r#"[
    { "file": "ABEBSIC.BND", "id": 5, "anims": [{ "name": "AbeWalking", "blend_mode": 1 }] },
    {
        "data_set_name": "AePcCd1",
        "is_psx": false,
        "lvls": [
            { "name": "RUNWARE.LVL", "files": ["ABEBSIC.BND"] },
            { "name": "R1.LVL", "files": ["R1PATH.BND", "R1P15C01.CAM", "MONK.VH", "MONK.VB"] }
        ]
    },
    {
        "data_set_name": "AePsxCd1",
        "is_psx": true,
        "scale_frame_offsets": true,
        "lvls": [{ "name": "R1.LVL", "files": ["ABEBSIC.BND", "R1PATH.BND", "R1P15C01.CAM"] }]
    },
    {
        "paths": [{
            "resource_name": "R1P15",
            "id": 15,
            "collision_offset": 256,
            "object_indextable_offset": 1024,
            "object_offset": 2048,
            "number_of_screens_x": 4,
            "number_of_screens_y": 3,
            "locations": [
                { "dataset": "AePcCd1", "file_name": "R1PATH.BND" },
                { "dataset": "AePsxCd1", "file_name": "R1PATH.BND" }
            ]
        }]
    },
    {
        "fmvs": [{
            "name": "Intro",
            "locations": [
                { "dataset": "AePcCd1", "file_name": "INTRO.DDV" },
                { "dataset": "AePsxCd1", "file_name": "MOVIES/INTRO.STR", "start_sector": 10, "end_sector": 90 }
            ]
        }]
    },
    {
        "sound_banks": [
            { "name": "MONK", "dataset": "AePcCd1", "lvl": "R1.LVL", "vab_header": "MONK.VH", "vab_body": "MONK.VB" }
        ]
    },
    {
        "sound_effects": [
            {
                "name": "MonkHello",
                "dataset": "AePcCd1",
                "sound_bank": "MONK",
                "program": 3,
                "note": 60,
                "min_pitch": -10,
                "max_pitch": 10
            }
        ]
    },
    {
        "musics": [
            { "name": "RuptureTheme", "dataset": "AePcCd1", "lvl": "R1.LVL", "file": "R1SEQ.BSQ", "index": 1, "sound_bank": "MONK" }
        ]
    }
]"#;

static DIRS: AtomicUsize = AtomicUsize::new(0);

/// Unpacks `files` into a fresh directory and mounts it as the data set `name`.
fn data_set(root: &Path, name: &str, files: &[(&str, Vec<u8>)], is_mod: bool) -> ActiveDataSet {
    let dir = root.join(format!("{}.{}", name, DIRS.fetch_add(1, Ordering::SeqCst)));
    std::fs::create_dir_all(&dir).unwrap();
    for (file, bytes) in files {
        write_files(&dir, &[(*file, &bytes[..])]);
    }

    ActiveDataSet {
        data_set_name: name.to_owned(),
        is_mod,
        fs: Arc::new(Directory::new(dir).unwrap()),
    }
}

fn locator(loader: &ToyLoader) -> ResourceLocator {
    setup();

    let mapper = ResourceMapper::from_json(RESOURCES).unwrap();
    let paths = DataPaths::new(DataSetIdentities::default(), Vec::<String>::new());
    ResourceLocator::new(mapper, paths, loader.clone())
}

fn anim_lvl(bytes: &[u8]) -> Vec<u8> {
    ToyLvl::new().chunk("ABEBSIC.BND", 5, "Anim", bytes).to_bytes()
}

#[test]
fn scenario() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();
    let locator = locator(&loader);

    locator.set_active_data_sets(vec![data_set(
        tmp.path(),
        "AePcCd1",
        &[("RUNWARE.LVL", anim_lvl(b"walk"))],
        false,
    )]);

    let anim = locator.locate_animation("AbeWalking").unwrap();
    assert_eq!(anim.data_set, "AePcCd1");
    assert_eq!(anim.lvl, "RUNWARE.LVL");
    assert_eq!(anim.file, "ABEBSIC.BND");
    assert_eq!(anim.id, 5);
    assert_eq!(anim.chunk.id, 5);
    assert_eq!(anim.chunk.kind, ChunkType::ANIM);
    assert_eq!(&anim.chunk.bytes[..], b"walk");
    assert_eq!(anim.blend_mode, 1);
    assert!(!anim.is_psx);
}

#[test]
fn priority() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();
    let locator = locator(&loader);

    let pc = data_set(tmp.path(), "AePcCd1", &[("RUNWARE.LVL", anim_lvl(b"pc"))], false);
    let psx = data_set(tmp.path(), "AePsxCd1", &[("R1.LVL", anim_lvl(b"psx"))], false);

    locator.set_active_data_sets(vec![psx.clone(), pc.clone()]);
    let anim = locator.locate_animation("AbeWalking").unwrap();
    assert_eq!(&anim.chunk.bytes[..], b"psx");
    assert!(anim.is_psx);
    assert!(anim.scale_frame_offsets);

    locator.set_active_data_sets(vec![pc, psx]);
    let anim = locator.locate_animation("AbeWalking").unwrap();
    assert_eq!(&anim.chunk.bytes[..], b"pc");
}

#[test]
fn one_shot_resolution() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();
    let locator = locator(&loader);

    // The archive and the file are found, but the chunk is not.
    let broken = ToyLvl::new().chunk("ABEBSIC.BND", 6, "Anim", b"other").to_bytes();
    let pc = data_set(tmp.path(), "AePcCd1", &[("RUNWARE.LVL", broken)], false);
    let psx = data_set(tmp.path(), "AePsxCd1", &[("R1.LVL", anim_lvl(b"psx"))], false);

    locator.set_active_data_sets(vec![pc, psx]);
    assert!(locator.locate_animation("AbeWalking").is_none());
}

#[test]
fn falls_through_missing_archives() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();
    let locator = locator(&loader);

    // No archive at all, an archive without the file, and a corrupted archive.
    let empty = data_set(tmp.path(), "AePcCd1", &[], false);
    let no_file = ToyLvl::new().chunk("OTHER.BND", 5, "Anim", b"x").to_bytes();
    let wrong = data_set(tmp.path(), "AePcCd1", &[("RUNWARE.LVL", no_file)], false);
    let corrupted = data_set(tmp.path(), "AePsxCd1", &[("R1.LVL", b"garbage".to_vec())], false);
    let good = data_set(tmp.path(), "AePsxCd1", &[("R1.LVL", anim_lvl(b"psx"))], false);

    locator.set_active_data_sets(vec![empty, wrong.clone(), corrupted]);
    assert!(locator.locate_animation("AbeWalking").is_none());

    locator.set_active_data_sets(vec![wrong, good]);
    let anim = locator.locate_animation("AbeWalking").unwrap();
    assert_eq!(&anim.chunk.bytes[..], b"psx");
}

#[test]
fn not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();
    let locator = locator(&loader);

    assert!(locator.locate_animation("AbeWalking").is_none());

    locator.set_active_data_sets(vec![data_set(
        tmp.path(),
        "AePcCd1",
        &[("RUNWARE.LVL", anim_lvl(b"walk"))],
        false,
    )]);

    assert!(locator.locate_animation("AbeFlying").is_none());
    assert!(locator.locate_path("R9P01").is_none());
    assert!(locator.locate_fmv("Outro").is_none());
    assert!(locator.locate_sound_bank("SLIG").is_none());
    assert!(locator.locate_camera("R9P01C01.CAM").is_none());
}

#[test]
fn mods_are_skipped_for_animations() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();
    let locator = locator(&loader);

    let overlay = data_set(tmp.path(), "AePcCd1", &[("RUNWARE.LVL", anim_lvl(b"mod"))], true);
    let pc = data_set(tmp.path(), "AePcCd1", &[("RUNWARE.LVL", anim_lvl(b"pc"))], false);

    locator.set_active_data_sets(vec![overlay, pc]);
    let anim = locator.locate_animation("AbeWalking").unwrap();
    assert_eq!(&anim.chunk.bytes[..], b"pc");
}

#[test]
fn explicit_data_set() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();
    let locator = locator(&loader);

    let pc = data_set(tmp.path(), "AePcCd1", &[("RUNWARE.LVL", anim_lvl(b"pc"))], false);
    let psx = data_set(tmp.path(), "AePsxCd1", &[("R1.LVL", anim_lvl(b"psx"))], false);
    locator.set_active_data_sets(vec![pc, psx]);

    let anim = locator.locate_animation_in("AbeWalking", "AePsxCd1").unwrap();
    assert_eq!(&anim.chunk.bytes[..], b"psx");

    let anim = locator.locate_animation_in("AbeWalking", "AePcCd1").unwrap();
    assert_eq!(&anim.chunk.bytes[..], b"pc");

    assert!(locator.locate_animation_in("AbeWalking", "AoPc").is_none());
    assert!(locator.locate_animation_in("AbeFlying", "AePcCd1").is_none());
}

#[test]
fn archives_are_shared() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();
    let locator = locator(&loader);

    locator.set_active_data_sets(vec![data_set(
        tmp.path(),
        "AePcCd1",
        &[("RUNWARE.LVL", anim_lvl(b"walk"))],
        false,
    )]);

    let a = locator.locate_animation("AbeWalking").unwrap();
    let b = locator.locate_animation("AbeWalking").unwrap();
    assert_eq!(loader.loads(), 1);
    assert!(Resource::ptr_eq(&a.archive, &b.archive));
    assert!(Resource::ptr_eq(&a.chunk, &b.chunk));

    drop(a);
    drop(b);
    assert!(locator.cache().is_empty());

    let _c = locator.locate_animation("AbeWalking").unwrap();
    assert_eq!(loader.loads(), 2);
}

#[test]
fn paths() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();
    let locator = locator(&loader);

    let lvl = ToyLvl::new()
        .chunk("R1PATH.BND", 14, "Path", b"r1p14")
        .chunk("R1PATH.BND", 15, "Path", b"r1p15")
        .to_bytes();

    locator.set_active_data_sets(vec![data_set(
        tmp.path(),
        "AePcCd1",
        &[("R1.LVL", lvl)],
        false,
    )]);

    let path = locator.locate_path("R1P15").unwrap();
    assert_eq!(path.data_set, "AePcCd1");
    assert_eq!(path.lvl, "R1.LVL");
    assert_eq!(&path.chunk.bytes[..], b"r1p15");
    assert_eq!(path.chunk.kind, ChunkType::PATH);
    assert_eq!(path.collision_offset, 256);
    assert_eq!(path.object_indextable_offset, 1024);
    assert_eq!(path.object_offset, 2048);
    assert_eq!((path.number_of_screens_x, path.number_of_screens_y), (4, 3));
    assert_eq!(path.music_theme, None);
    assert!(!path.is_ao);
}

#[test]
fn cameras() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();
    let locator = locator(&loader);

    let lvl = ToyLvl::new()
        .chunk("R1P15C01.CAM", 1, "Bits", b"bits")
        .chunk("R1P15C01.CAM", 2, "FG1", b"fg1")
        .to_bytes();
    let pc = data_set(tmp.path(), "AePcCd1", &[("R1.LVL", lvl)], false);

    locator.set_active_data_sets(vec![pc.clone()]);
    match locator.locate_camera("R1P15C01.CAM").unwrap() {
        Camera::Original { data_set, lvl, bits, fg1 } => {
            assert_eq!(data_set, "AePcCd1");
            assert_eq!(lvl, "R1.LVL");
            assert_eq!(&bits.bytes[..], b"bits");
            assert_eq!(fg1.unwrap().kind, ChunkType::FG1);
        }
        _ => panic!("expected the original camera"),
    }

    let replacement = data_set(
        tmp.path(),
        "ModA",
        &[("R1P15C01.CAM.png", b"png".to_vec())],
        true,
    );

    locator.set_active_data_sets(vec![replacement, pc.clone()]);
    match locator.locate_camera("R1P15C01.CAM").unwrap() {
        Camera::Replacement { data_set, mut image } => {
            assert_eq!(data_set, "ModA");
            let mut buf = String::new();
            image.read_to_string(&mut buf).unwrap();
            assert_eq!(buf, "png");
        }
        _ => panic!("expected a replacement camera"),
    }

    let delta = data_set(
        tmp.path(),
        "ModB",
        &[("R1P15C01.CAM.cam.bmp.png", b"delta".to_vec())],
        true,
    );

    locator.set_active_data_sets(vec![delta.clone(), pc]);
    let camera = locator.locate_camera("R1P15C01.CAM").unwrap();
    assert_eq!(camera.data_set(), "ModB");
    match camera {
        Camera::Delta { original, .. } => assert_eq!(original.data_set(), "AePcCd1"),
        _ => panic!("expected a camera delta"),
    }

    // A delta without its original camera supplies nothing.
    locator.set_active_data_sets(vec![delta]);
    assert!(locator.locate_camera("R1P15C01.CAM").is_none());
}

#[test]
fn sound_banks() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();
    let locator = locator(&loader);

    let lvl = ToyLvl::new()
        .chunk("MONK.VH", 0, "VabH", b"vh")
        .chunk("MONK.VB", 0, "VabB", b"vb")
        .to_bytes();

    locator.set_active_data_sets(vec![data_set(
        tmp.path(),
        "AePcCd1",
        &[("R1.LVL", lvl), ("sounds.dat", b"samples".to_vec())],
        false,
    )]);

    let bank = locator.locate_sound_bank("MONK").unwrap();
    assert_eq!(bank.data_set, "AePcCd1");
    assert!(!bank.is_psx);
    assert_eq!(&bank.header.bytes[..], b"vh");
    assert_eq!(&bank.body.bytes[..], b"vb");

    let mut buf = String::new();
    bank.sounds_dat.unwrap().read_to_string(&mut buf).unwrap();
    assert_eq!(buf, "samples");
}

fn bank_lvl() -> ToyLvl {
    ToyLvl::new()
        .chunk("MONK.VH", 0, "VabH", b"vh")
        .chunk("MONK.VB", 0, "VabB", b"vb")
}

#[test]
fn sound_effects() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();
    let locator = locator(&loader);

    assert!(locator.locate_sound_effect("MonkHello").is_none());

    locator.set_active_data_sets(vec![data_set(
        tmp.path(),
        "AePcCd1",
        &[("R1.LVL", bank_lvl().to_bytes())],
        false,
    )]);

    let effect = locator.locate_sound_effect("MonkHello").unwrap();
    assert_eq!(effect.data_set, "AePcCd1");
    assert_eq!((effect.program, effect.note), (3, 60));
    assert_eq!((effect.min_pitch, effect.max_pitch), (-10, 10));
    assert_eq!(&effect.bank.header.bytes[..], b"vh");
    assert!(effect.bank.sounds_dat.is_none());

    assert!(locator.locate_sound_effect("SligHello").is_none());
}

#[test]
fn musics() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();
    let locator = locator(&loader);

    let lvl = bank_lvl()
        .chunk("R1SEQ.BSQ", 0, "Seq", b"intro")
        .chunk("R1SEQ.BSQ", 1, "Seq", b"theme")
        .to_bytes();

    locator.set_active_data_sets(vec![data_set(
        tmp.path(),
        "AePcCd1",
        &[("R1.LVL", lvl)],
        false,
    )]);

    let music = locator.locate_music("RuptureTheme").unwrap();
    assert_eq!(music.data_set, "AePcCd1");
    assert_eq!(music.file, "R1SEQ.BSQ");
    assert_eq!(&music.sequence.bytes[..], b"theme");
    assert_eq!(&music.bank.body.bytes[..], b"vb");

    // The sequence file is there but its chunk is not.
    let lvl = bank_lvl().chunk("R1SEQ.BSQ", 0, "Seq", b"intro").to_bytes();
    locator.set_active_data_sets(vec![data_set(
        tmp.path(),
        "AePcCd1",
        &[("R1.LVL", lvl)],
        false,
    )]);
    assert!(locator.locate_music("RuptureTheme").is_none());

    // Music is never supplied by other data sets.
    locator.set_active_data_sets(vec![data_set(
        tmp.path(),
        "AePsxCd1",
        &[("R1.LVL", bank_lvl().chunk("R1SEQ.BSQ", 1, "Seq", b"x").to_bytes())],
        false,
    )]);
    assert!(locator.locate_music("RuptureTheme").is_none());
}

#[test]
fn subtitles() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();

    let game = tmp.path().join("game");
    write_files(&game, &[("data/subtitles/Intro.SRT", &b"Hello"[..])]);

    let pc = data_set(tmp.path(), "AePcCd1", &[("INTRO.DDV", b"ddv".to_vec())], false);

    let locator = locator(&loader);
    locator.set_active_data_sets(vec![pc.clone()]);
    assert!(locator.locate_fmv("Intro").unwrap().subtitles.is_none());

    let locator = locator.with_game_fs(Arc::new(Directory::new(&game).unwrap()));
    locator.set_active_data_sets(vec![pc]);

    let mut fmv = locator.locate_fmv("Intro").unwrap();
    let mut buf = String::new();
    fmv.subtitles.as_mut().unwrap().read_to_string(&mut buf).unwrap();
    assert_eq!(buf, "Hello");
}

#[test]
fn fmvs() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();
    let locator = locator(&loader);

    let pc = data_set(tmp.path(), "AePcCd1", &[], false);
    let psx = data_set(
        tmp.path(),
        "AePsxCd1",
        &[("MOVIES/INTRO.STR", b"str".to_vec())],
        false,
    );

    locator.set_active_data_sets(vec![pc, psx]);
    let mut fmv = locator.locate_fmv("Intro").unwrap();
    assert_eq!(fmv.data_set, "AePsxCd1");
    assert_eq!(fmv.file_name, "MOVIES/INTRO.STR");
    assert_eq!((fmv.start_sector, fmv.end_sector), (Some(10), Some(90)));

    let mut buf = Vec::new();
    fmv.stream.read_to_end(&mut buf).unwrap();
    assert_eq!(buf, b"str");
}

#[test]
fn snapshots() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();
    let locator = locator(&loader);

    let pc = data_set(tmp.path(), "AePcCd1", &[], false);
    locator.set_active_data_sets(vec![pc]);

    let snapshot = locator.active_data_paths();
    locator.set_active_data_sets(Vec::new());

    assert_eq!(snapshot.len(), 1);
    assert!(locator.active_data_paths().is_empty());
}

#[test]
fn asynchronous() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();
    let locator = Arc::new(locator(&loader));

    let lvl = ToyLvl::new().chunk("R1PATH.BND", 15, "Path", b"r1p15").to_bytes();
    locator.set_active_data_sets(vec![
        data_set(tmp.path(), "AePcCd1", &[("R1.LVL", lvl)], false),
        data_set(tmp.path(), "AePsxCd1", &[("R1.LVL", anim_lvl(b"psx"))], false),
    ]);

    let mut path = locator.locate_path_async("R1P15");
    let anim = locator.locate_animation_async("AbeWalking");
    let missing = locator.locate_path_async("R9P01");

    while !path.poll() {
        std::thread::yield_now();
    }

    let path = path.wait().unwrap().unwrap();
    assert_eq!(&path.chunk.bytes[..], b"r1p15");

    let anim = anim.wait().unwrap().unwrap();
    assert_eq!(anim.data_set, "AePsxCd1");

    assert!(missing.wait().unwrap().is_none());
}

#[test]
fn activated_from_definitions() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = ToyLoader::default();

    let lvl = anim_lvl(b"pc");
    let definition = r#"{
        "Name": "Mod X",
        "Description": "",
        "Author": "",
        "InitialLevel": "",
        "DatasetName": "ModX",
        "RequiredDatasets": ["AePc"]
    }"#;

    write_files(
        tmp.path(),
        &[
            ("AePcCd1/ABEWIN.EXE", &b""[..]),
            ("AePcCd1/RUNWARE.LVL", &lvl[..]),
            ("Mods/ModX/GameDefinition.json", definition.as_bytes()),
            ("Mods/ModX/R1P15C01.CAM.png", &b"png"[..]),
        ],
    );

    let ids = DataSetIdentities::from_json(
        r#"{ "AePcCd1": { "contains_all": ["ABEWIN.EXE"] }, "AePc": {} }"#,
    )
    .unwrap();

    let cd1 = tmp.path().join("AePcCd1");
    let paths = DataPaths::new(ids, vec![cd1.to_str().unwrap()]);

    let mods: Arc<dyn FileSystem> = Arc::new(Directory::new(tmp.path().join("Mods")).unwrap());
    let mut all = GameDefinition::load_mods(mods).unwrap();
    all.push(GameDefinition::new("AePc", "AePc", vec!["AePcCd1".to_owned()], false));
    all.push(GameDefinition::new("AePcCd1", "AePcCd1", vec![], false));

    let root = GameDefinition::find(&all, "ModX").unwrap();
    let mut deps = GameDefinition::get_dependencies(root, &all);
    assert_eq!(deps.names(), ["ModX", "AePc", "AePcCd1"]);

    paths.resolve_paths(&mut deps.data_sets);
    assert!(deps.data_sets[0].data_set_path.as_ref().unwrap().ends_with("Mods/ModX"));
    assert_eq!(deps.data_sets[1].data_set_path, None);
    assert_eq!(deps.data_sets[2].data_set_path.as_ref().map(|v| v.as_str()), cd1.to_str());

    let mapper = ResourceMapper::from_json(RESOURCES).unwrap();
    let locator = ResourceLocator::new(mapper, paths, loader);
    locator.set_active_data_paths(&deps.data_sets).unwrap();

    let active = locator.active_data_paths();
    let names: Vec<_> = active.iter().map(|v| (v.data_set_name.as_str(), v.is_mod)).collect();
    assert_eq!(names, [("ModX", true), ("AePcCd1", false)]);

    assert_eq!(locator.locate_animation("AbeWalking").unwrap().data_set, "AePcCd1");
    assert_eq!(locator.locate_camera("R1P15C01.CAM").unwrap().data_set(), "ModX");
}
