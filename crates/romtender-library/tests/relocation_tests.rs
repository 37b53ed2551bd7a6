//! Integration tests for ROM relocation and its companion updates

use romtender_library::relocate::MAX_DEPTH_EXCEEDED;
use romtender_library::{
    ArchiveDeletion, ArtCategory, Collection, CollectionStore, CompanionKind, CompanionStatus,
    LibraryError, LibraryLayout, LocalThumbnailMirror, PlayTracker, Relocator, RomAction,
    RomDirectory, RomItem, delete_archive, find_art, find_existing_art, list_archives,
    scan_directory,
};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const GBA: &str = "Game Boy Advance (GBA)";
const PS: &str = "Sony PlayStation (PS)";

/// Test helper laying out a ROM root, saves, collections and a tracker
struct TestEnvironment {
    temp_dir: TempDir,
    layout: LibraryLayout,
}

impl TestEnvironment {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let layout = LibraryLayout {
            rom_root: temp_dir.path().join("Roms"),
            saves_root: temp_dir.path().join("Saves"),
            collections_dir: temp_dir.path().join("Collections"),
            tracker_db: temp_dir.path().join("game_logs.sqlite"),
        };

        for platform in [GBA, PS] {
            fs::create_dir_all(layout.rom_root.join(platform)).expect("Failed to create ROM dir");
        }
        PlayTracker::create(&layout.tracker_db).expect("Failed to create tracker");

        Self { temp_dir, layout }
    }

    fn dir(&self, relative: &str) -> RomDirectory {
        RomDirectory::new(self.layout.rom_root.join(relative))
    }

    fn create_rom(&self, relative_dir: &str, name: &str) -> RomItem {
        let dir = self.dir(relative_dir);
        fs::create_dir_all(&dir.path).unwrap();
        let path = dir.join(name);
        fs::write(&path, b"FAKE_ROM_DATA").unwrap();
        RomItem::file(path, &dir.tag)
    }

    fn create_rom_dir(&self, relative_dir: &str, name: &str) -> RomItem {
        let dir = self.dir(relative_dir);
        let path = dir.join(name);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join(format!("{} (Track 1).bin", name)), b"FAKE_ROM_DATA").unwrap();
        RomItem::directory(path, &dir.tag)
    }

    fn create_art(&self, relative_dir: &str, name: &str) -> PathBuf {
        let media = self.dir(relative_dir).media_dir();
        fs::create_dir_all(&media).unwrap();
        let path = media.join(name);
        fs::write(&path, b"PNG").unwrap();
        path
    }

    fn create_save(&self, tag: &str, name: &str) -> PathBuf {
        let dir = self.layout.saves_root.join(tag);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, b"SAVE").unwrap();
        path
    }

    fn track(&self, file_path: &str, name: &str) {
        let conn = Connection::open(&self.layout.tracker_db).unwrap();
        conn.execute(
            "INSERT INTO rom (name, file_path) VALUES (?1, ?2)",
            [name, file_path],
        )
        .unwrap();
        let id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO play_activity (rom_id, play_time) VALUES (?1, 600)",
            [id],
        )
        .unwrap();
    }

    fn tracker(&self) -> PlayTracker {
        PlayTracker::new(&self.layout.tracker_db)
    }
}

fn status(outcome: &romtender_library::ActionOutcome, kind: CompanionKind) -> CompanionStatus {
    outcome.companions.statuses(kind)[0].clone()
}

#[test]
fn test_archive_then_restore_round_trip() {
    let env = TestEnvironment::new();
    let rom_dir = format!("{}/Hacks", GBA);
    let item = env.create_rom(&rom_dir, "Zelda Hack.gba");
    env.create_art(&rom_dir, "Zelda Hack.png");
    let relocator = Relocator::new(&env.layout);

    let archived = relocator
        .archive(&item, &env.dir(&rom_dir), "Archive")
        .unwrap();
    let archived_path = archived.path.clone().unwrap();
    assert_eq!(
        archived_path,
        env.layout
            .rom_root
            .join(".Archive")
            .join(GBA)
            .join("Hacks/Zelda Hack.gba")
    );
    assert!(!item.path.exists());
    assert_eq!(status(&archived, CompanionKind::Art), CompanionStatus::Done);

    let archived_dir = RomDirectory::new(archived_path.parent().unwrap());
    let archived_item = RomItem::file(&archived_path, &archived_dir.tag);
    assert!(find_existing_art(&archived_item, &archived_dir).is_some());

    let archive = list_archives(&env.layout.rom_root).unwrap().remove(0);
    assert_eq!(archive.display_name, "Archive");

    let restored = relocator
        .restore(&archived_item, &archived_dir, &archive)
        .unwrap();
    assert_eq!(restored.path, Some(item.path.clone()));
    assert!(item.path.exists());
    assert!(find_existing_art(&item, &env.dir(&rom_dir)).is_some());

    // Only empty folders remain, so the archive can go
    assert_eq!(delete_archive(&archive).unwrap(), ArchiveDeletion::Removed);
    assert!(list_archives(&env.layout.rom_root).unwrap().is_empty());
}

#[test]
fn test_archive_without_art_skips_companion() {
    let env = TestEnvironment::new();
    let item = env.create_rom(GBA, "Golden Sun.gba");

    let outcome = Relocator::new(&env.layout)
        .archive(&item, &env.dir(GBA), ".Archive")
        .unwrap();
    assert_eq!(status(&outcome, CompanionKind::Art), CompanionStatus::Skipped);
    assert!(outcome.companions.is_clean());
}

#[test]
fn test_archive_collision_aborts() {
    let env = TestEnvironment::new();
    let item = env.create_rom(GBA, "Golden Sun.gba");
    env.create_rom(&format!(".Archive/{}", GBA), "Golden Sun.gba");
    env.create_art(GBA, "Golden Sun.png");

    let result = Relocator::new(&env.layout).archive(&item, &env.dir(GBA), "Archive");
    assert!(matches!(result, Err(LibraryError::AlreadyExists(_))));
    assert!(item.path.exists());
    assert!(find_existing_art(&item, &env.dir(GBA)).is_some());
}

#[test]
fn test_archive_keeps_rom_when_art_move_fails() {
    let env = TestEnvironment::new();
    let item = env.create_rom(GBA, "Golden Sun.gba");
    let art = env.create_art(GBA, "Golden Sun.png");
    let archived_art = env.create_art(&format!(".Archive/{}", GBA), "Golden Sun.png");

    let outcome = Relocator::new(&env.layout)
        .archive(&item, &env.dir(GBA), "Archive")
        .unwrap();

    let archived_path = env.layout.rom_root.join(".Archive").join(GBA).join("Golden Sun.gba");
    assert_eq!(outcome.path, Some(archived_path.clone()));
    assert!(archived_path.exists());
    assert!(!item.path.exists());
    assert!(matches!(
        status(&outcome, CompanionKind::Art),
        CompanionStatus::Failed(_)
    ));
    assert!(art.exists());
    assert!(archived_art.exists());
}

#[test]
fn test_restore_keeps_rom_when_art_move_fails() {
    let env = TestEnvironment::new();
    let archived_rel = format!(".Archive/{}", GBA);
    let archived_item = env.create_rom(&archived_rel, "Mother 3.gba");
    env.create_art(&archived_rel, "Mother 3.png");
    let active_art = env.create_art(GBA, "Mother 3.png");
    let archive = RomDirectory::new(env.layout.rom_root.join(".Archive"));

    let outcome = Relocator::new(&env.layout)
        .restore(&archived_item, &env.dir(&archived_rel), &archive)
        .unwrap();

    let restored_path = env.dir(GBA).join("Mother 3.gba");
    assert_eq!(outcome.path, Some(restored_path.clone()));
    assert!(restored_path.exists());
    assert!(!archived_item.path.exists());
    assert!(matches!(
        status(&outcome, CompanionKind::Art),
        CompanionStatus::Failed(_)
    ));
    assert!(active_art.exists());
    assert!(env.dir(&archived_rel).media_dir().join("Mother 3.png").exists());
}

#[test]
fn test_delete_archive_blocked_by_archived_rom() {
    let env = TestEnvironment::new();
    let item = env.create_rom(GBA, "Golden Sun.gba");
    Relocator::new(&env.layout)
        .archive(&item, &env.dir(GBA), "Archive")
        .unwrap();

    let archive = RomDirectory::new(env.layout.rom_root.join(".Archive"));
    assert_eq!(
        delete_archive(&archive).unwrap(),
        ArchiveDeletion::Blocked("Golden Sun.gba".to_string())
    );
    assert!(archive.path.exists());
}

#[test]
fn test_delete_archive_depth_guard_message() {
    let env = TestEnvironment::new();
    let mut deep = env.layout.rom_root.join(".Deep");
    for level in 0..12 {
        deep = deep.join(format!("level{}", level));
    }
    fs::create_dir_all(&deep).unwrap();

    let archive = RomDirectory::new(env.layout.rom_root.join(".Deep"));
    assert_eq!(
        delete_archive(&archive).unwrap(),
        ArchiveDeletion::Blocked(MAX_DEPTH_EXCEEDED.to_string())
    );
}

#[test]
fn test_rename_updates_every_companion() {
    let env = TestEnvironment::new();
    let item = env.create_rom(GBA, "Metroid.gba");
    env.create_art(GBA, "Metroid.png");
    let full_save = env.create_save("GBA", "Metroid.gba.sav");
    let short_save = env.create_save("GBA", "Metroid.srm");
    let unrelated = env.create_save("GBA", "Metroid Zero.sav");
    env.track(&format!("{}/Metroid.gba", GBA), "Metroid");

    let outcome = Relocator::new(&env.layout)
        .rename(&item, "Metroid Fusion", &env.dir(GBA))
        .unwrap();

    assert_eq!(outcome.filename().as_deref(), Some("Metroid Fusion.gba"));
    assert!(!item.path.exists());
    assert!(env.dir(GBA).join("Metroid Fusion.gba").exists());
    assert!(outcome.companions.is_clean());

    assert!(outcome.companions.succeeded(CompanionKind::Art));
    assert!(env.dir(GBA).media_dir().join("Metroid Fusion.png").exists());

    assert_eq!(outcome.companions.statuses(CompanionKind::SaveFile).len(), 2);
    assert!(!full_save.exists());
    assert!(!short_save.exists());
    let saves = env.layout.saves_root.join("GBA");
    assert!(saves.join("Metroid Fusion.gba.sav").exists());
    assert!(saves.join("Metroid Fusion.srm").exists());
    assert!(unrelated.exists());

    assert!(outcome.companions.succeeded(CompanionKind::Tracker));
    let tracker = env.tracker();
    assert!(!tracker.has_data(&format!("{}/Metroid.gba", GBA)));
    let record = tracker
        .record(&format!("{}/Metroid Fusion.gba", GBA))
        .unwrap()
        .unwrap();
    assert_eq!(record.name, "Metroid Fusion");

    assert_eq!(
        status(&outcome, CompanionKind::DiscIndex),
        CompanionStatus::Skipped
    );
}

#[test]
fn test_rename_carries_disc_index_files() {
    let env = TestEnvironment::new();
    let item = env.create_rom(PS, "FF7.bin");
    env.create_rom(PS, "FF7.cue");
    env.create_rom(PS, "FF7.m3u");

    let outcome = Relocator::new(&env.layout)
        .rename(&item, "Final Fantasy VII", &env.dir(PS))
        .unwrap();

    let dir = env.dir(PS);
    assert!(dir.join("Final Fantasy VII.bin").exists());
    assert!(dir.join("Final Fantasy VII.cue").exists());
    assert!(dir.join("Final Fantasy VII.m3u").exists());
    assert_eq!(outcome.companions.statuses(CompanionKind::DiscIndex).len(), 2);
    assert_eq!(
        status(&outcome, CompanionKind::Tracker),
        CompanionStatus::Skipped
    );
}

#[test]
fn test_rename_multi_disc_directory() {
    let env = TestEnvironment::new();
    let game_dir = env.dir(PS).join("Game X");
    fs::create_dir_all(&game_dir).unwrap();
    fs::write(game_dir.join("Game X.m3u"), "Game X (Disc 1).chd\n").unwrap();
    let item = RomItem::directory(&game_dir, "PS");
    assert!(item.is_multi_disc_directory);

    let outcome = Relocator::new(&env.layout)
        .rename(&item, "Game Y", &env.dir(PS))
        .unwrap();

    let renamed = env.dir(PS).join("Game Y");
    assert_eq!(outcome.path, Some(renamed.clone()));
    assert!(renamed.join("Game Y.m3u").exists());
    assert!(outcome.companions.succeeded(CompanionKind::DiscIndex));
}

#[test]
fn test_rename_survives_tracker_failure() {
    let env = TestEnvironment::new();
    let item = env.create_rom(GBA, "Advance Wars.gba");
    let art = env.create_art(GBA, "Advance Wars.png");
    let save = env.create_save("GBA", "Advance Wars.sav");
    fs::remove_file(&env.layout.tracker_db).unwrap();

    let outcome = Relocator::new(&env.layout)
        .rename(&item, "Advance Wars 2", &env.dir(GBA))
        .unwrap();

    assert_eq!(outcome.filename().as_deref(), Some("Advance Wars 2.gba"));
    let failures = outcome.companions.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, CompanionKind::Tracker);

    // Steps after the tracker still ran
    assert!(outcome.companions.succeeded(CompanionKind::SaveFile));
    assert!(!save.exists());
    assert!(env.layout.saves_root.join("GBA/Advance Wars 2.sav").exists());
    assert!(outcome.companions.succeeded(CompanionKind::Art));
    assert!(!art.exists());
    assert!(env.dir(GBA).media_dir().join("Advance Wars 2.png").exists());
}

#[test]
fn test_rename_directory_with_dotted_name_moves_its_art() {
    let env = TestEnvironment::new();
    let item = env.create_rom_dir(PS, "Metal Gear Solid (v1.1)");
    let art = env.create_art(PS, "Metal Gear Solid (v1.1).png");

    let outcome = Relocator::new(&env.layout)
        .rename(&item, "Metal Gear Solid", &env.dir(PS))
        .unwrap();

    assert_eq!(outcome.path, Some(env.dir(PS).join("Metal Gear Solid")));
    assert!(outcome.companions.succeeded(CompanionKind::Art));
    assert!(!art.exists());
    assert!(env.dir(PS).media_dir().join("Metal Gear Solid.png").exists());
}

#[test]
fn test_rename_onto_existing_rom_fails() {
    let env = TestEnvironment::new();
    let item = env.create_rom(GBA, "A.gba");
    env.create_rom(GBA, "B.gba");

    let result = Relocator::new(&env.layout).rename(&item, "B", &env.dir(GBA));
    assert!(matches!(result, Err(LibraryError::AlreadyExists(_))));
    assert!(item.path.exists());
}

#[test]
fn test_delete_removes_art_after_rom() {
    let env = TestEnvironment::new();
    let item = env.create_rom(GBA, "Kuru Kuru Kururin.gba");
    let art = env.create_art(GBA, "Kuru Kuru Kururin.png");

    let outcome = Relocator::new(&env.layout)
        .delete(&item, &env.dir(GBA))
        .unwrap();
    assert_eq!(outcome.path, None);
    assert!(!item.path.exists());
    assert!(!art.exists());
    assert!(outcome.companions.succeeded(CompanionKind::Art));
}

#[test]
fn test_delete_directory_with_dotted_name() {
    let env = TestEnvironment::new();
    let item = env.create_rom_dir(PS, "Dr. Mario");
    let own_art = env.create_art(PS, "Dr. Mario.png");
    env.create_rom(PS, "Dr.bin");
    let other_art = env.create_art(PS, "Dr.png");

    let outcome = Relocator::new(&env.layout)
        .delete(&item, &env.dir(PS))
        .unwrap();

    assert!(!item.path.exists());
    assert!(outcome.companions.succeeded(CompanionKind::Art));
    assert!(!own_art.exists());
    assert!(other_art.exists());
}

#[test]
fn test_failed_delete_keeps_art() {
    let env = TestEnvironment::new();
    let item = RomItem::file(env.dir(GBA).join("Ghost.gba"), "GBA");
    let art = env.create_art(GBA, "Ghost.png");

    let result = Relocator::new(&env.layout).delete(&item, &env.dir(GBA));
    assert!(matches!(result, Err(LibraryError::Io(_))));
    assert!(art.exists());
}

#[test]
fn test_nuke_clears_tracker_and_deletes() {
    let env = TestEnvironment::new();
    let item = env.create_rom(GBA, "Pokemon Emerald.gba");
    env.track(&format!("{}/Pokemon Emerald.gba", GBA), "Pokemon Emerald");

    let outcome = Relocator::new(&env.layout)
        .apply(&RomAction::Nuke, &item, &env.dir(GBA))
        .unwrap();

    assert!(!item.path.exists());
    assert_eq!(outcome.companions.entries()[0].0, CompanionKind::Tracker);
    assert!(outcome.companions.succeeded(CompanionKind::Tracker));
    assert!(!env.tracker().has_data(&format!("{}/Pokemon Emerald.gba", GBA)));
}

#[test]
fn test_nuke_without_tracker_still_deletes() {
    let env = TestEnvironment::new();
    let item = env.create_rom(GBA, "Untracked.gba");
    fs::remove_file(&env.layout.tracker_db).unwrap();

    let outcome = Relocator::new(&env.layout)
        .nuke(&item, &env.dir(GBA))
        .unwrap();
    assert!(!item.path.exists());
    assert!(matches!(
        status(&outcome, CompanionKind::Tracker),
        CompanionStatus::Failed(_)
    ));
}

#[test]
fn test_apply_dispatches_each_action() {
    let env = TestEnvironment::new();
    let relocator = Relocator::new(&env.layout);
    let item = env.create_rom(GBA, "Wario Ware.gba");

    let renamed = relocator
        .apply(
            &RomAction::Rename {
                new_name: "WarioWare".to_string(),
            },
            &item,
            &env.dir(GBA),
        )
        .unwrap();
    let item = RomItem::file(renamed.path.unwrap(), "GBA");

    let archived = relocator
        .apply(
            &RomAction::Archive {
                archive_name: "Shelf".to_string(),
            },
            &item,
            &env.dir(GBA),
        )
        .unwrap();
    let archived_path = archived.path.unwrap();
    let archived_dir = RomDirectory::new(archived_path.parent().unwrap());
    let archive = RomDirectory::new(env.layout.rom_root.join(".Shelf"));

    let restored = relocator
        .apply(
            &RomAction::Restore { archive },
            &RomItem::file(&archived_path, &archived_dir.tag),
            &archived_dir,
        )
        .unwrap();
    assert_eq!(restored.path, Some(item.path.clone()));

    relocator
        .apply(&RomAction::Delete, &item, &env.dir(GBA))
        .unwrap();
    assert!(scan_directory(&env.dir(GBA)).unwrap().is_empty());
}

#[test]
fn test_find_art_from_mirror() {
    let env = TestEnvironment::new();
    let mirror_root = env.temp_dir.path().join("thumbnails");
    let boxarts = mirror_root.join("Nintendo - Game Boy Advance/Named_Boxarts");
    fs::create_dir_all(&boxarts).unwrap();
    fs::write(boxarts.join("Metroid - Fusion (USA).png"), b"PNG").unwrap();
    fs::write(boxarts.join("Mario Kart - Super Circuit (USA).png"), b"PNG").unwrap();

    let item = env.create_rom(GBA, "Metroid Fusion (USA).gba");
    let mirror = LocalThumbnailMirror::new(&mirror_root);

    let art = find_art(
        &mirror,
        "Nintendo - Game Boy Advance",
        &env.dir(GBA),
        &item,
        ArtCategory::BoxArt,
        0.8,
    );
    let expected = env.dir(GBA).media_dir().join("Metroid Fusion (USA).png");
    assert_eq!(art, Some(expected.clone()));
    assert_eq!(find_existing_art(&item, &env.dir(GBA)), Some(expected));

    let missing = find_art(
        &mirror,
        "Nintendo - Game Boy Advance",
        &env.dir(GBA),
        &item,
        ArtCategory::Snap,
        0.8,
    );
    assert_eq!(missing, None);
}

#[test]
fn test_collection_from_scanned_roms() {
    let env = TestEnvironment::new();
    env.create_rom(GBA, "Metroid Fusion.gba");
    env.create_rom(GBA, "Golden Sun.gba");
    let store = CollectionStore::new(&env.layout);

    let games = scan_directory(&env.dir(GBA)).unwrap();
    let mut collection = Collection::new("Favorites", &env.layout.collections_dir);
    assert_eq!(store.add_games(&mut collection, &games).unwrap(), 2);

    let written = fs::read_to_string(&collection.file).unwrap();
    assert_eq!(
        written,
        format!(
            "/Roms/{gba}/Golden Sun.gba\n/Roms/{gba}/Metroid Fusion.gba\n",
            gba = GBA
        )
    );

    let listed = store.generate_list(None).unwrap();
    assert_eq!(listed.len(), 1);
    let loaded = store.read(&listed[0].path).unwrap();
    assert_eq!(loaded.games[1].display_name, "Metroid Fusion");
    assert_eq!(loaded.games[1].tag, "GBA");
}

#[test]
fn test_orphaned_tracker_rows_after_external_move() {
    let env = TestEnvironment::new();
    let item = env.create_rom(GBA, "Mother 3.gba");
    env.track(&format!("{}/Mother 3.gba", GBA), "Mother 3");
    assert!(env.tracker().orphaned_records(&env.layout.rom_root).unwrap().is_empty());

    // Archiving does not touch the tracker, so the row is left behind
    Relocator::new(&env.layout)
        .archive(&item, &env.dir(GBA), "Archive")
        .unwrap();
    let orphans = env.tracker().orphaned_records(&env.layout.rom_root).unwrap();
    assert_eq!(orphans.len(), 1);
    assert!(Path::new(&orphans[0].file_path).ends_with("Mother 3.gba"));
}
