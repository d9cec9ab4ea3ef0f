//! Airside Forms Database Seeder
//!
//! Mengisi database dengan sub-role, akun contoh, dan dua form contoh.
//! Aman dijalankan berulang kali: baris yang sudah ada dilewati.
//!
//! Usage:
//!   cargo run --bin airside_seed
//!
//! Environment:
//!   DB_URL   - SQLite file (default: data.db)
//!   RUST_LOG - Log level (default: info)

use airside_forms::core::auth::hash_password;
use airside_forms::core::FormDefinition;
use airside_forms::models::config::resolve_db_path;
use airside_forms::models::{NewUser, Role, SubRole, User};
use airside_forms::storage::Store;
use airside_forms::utils::constants::DEFAULT_DB_PATH;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SUB_ROLES: [(&str, &str); 5] = [
    ("Teknisi Mesin", "Teknisi yang menangani peralatan mesin dan mekanik"),
    ("Teknisi Listrik", "Teknisi yang menangani instalasi dan peralatan listrik"),
    ("Teknisi Elektronik", "Teknisi yang menangani peralatan elektronik dan sistem kontrol"),
    ("Teknisi HVAC", "Teknisi yang menangani sistem pendingin dan ventilasi"),
    ("Teknisi Ground Support", "Teknisi yang menangani peralatan ground support equipment"),
];

const ADMIN_PASSWORD: &str = "admin123";
const TEKNISI_PASSWORD: &str = "teknisi123";

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    info!("🌱 Starting database seed...");

    let db_url = std::env::var("DB_URL").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    let store = Store::open(resolve_db_path(&db_url))?;

    let sub_roles = seed_sub_roles(&store)?;

    // Hash sekali, dipakai ulang untuk akun dengan password sama
    let admin_hash = hash_password(ADMIN_PASSWORD)?;
    let teknisi_hash = hash_password(TEKNISI_PASSWORD)?;

    seed_user(&store, "Super Admin", "superadmin", &admin_hash, Role::Superadmin, None)?;
    let admin = seed_user(&store, "Admin", "admin", &admin_hash, Role::Admin, None)?;

    for (i, sub_role) in sub_roles.iter().take(3).enumerate() {
        let short = sub_role.name.split(' ').nth(1).unwrap_or(&sub_role.name);
        seed_user(
            &store,
            &format!("Teknisi {short}"),
            &format!("teknisi{}", i + 1),
            &teknisi_hash,
            Role::Teknisi,
            Some(sub_role.id.clone()),
        )?;
    }

    info!("📝 Creating sample forms...");
    match sub_roles.iter().find(|r| r.name == "Teknisi Mesin") {
        Some(mesin) => seed_form(&store, &admin, genset_checklist(mesin)?)?,
        None => warn!("⚠️ Teknisi Mesin missing, genset checklist skipped"),
    }
    seed_form(&store, &admin, incident_report()?)?;

    info!("🎉 Seed completed!");
    info!("📋 Login credentials:");
    info!("   Superadmin: superadmin / {}", ADMIN_PASSWORD);
    info!("   Admin: admin / {}", ADMIN_PASSWORD);
    for i in 1..=3 {
        info!("   Teknisi {i}: teknisi{i} / {}", TEKNISI_PASSWORD);
    }

    Ok(())
}

fn seed_sub_roles(store: &Store) -> eyre::Result<Vec<SubRole>> {
    let mut seeded = Vec::with_capacity(SUB_ROLES.len());
    for (name, description) in SUB_ROLES {
        match store.find_sub_role_by_name(name)? {
            Some(existing) => {
                warn!("⚠️ Sub-role already exists: {}", name);
                seeded.push(existing);
            }
            None => {
                seeded.push(store.insert_sub_role(name, Some(description))?);
                info!("✅ Sub-role created: {}", name);
            }
        }
    }
    Ok(seeded)
}

fn seed_user(
    store: &Store,
    name: &str,
    username: &str,
    password_hash: &str,
    role: Role,
    sub_role_id: Option<String>,
) -> eyre::Result<User> {
    if let Some(existing) = store.find_user_by_username(username)? {
        warn!("⚠️ User already exists: {}", username);
        return Ok(existing);
    }

    let user = store.insert_user(&NewUser {
        name: name.to_string(),
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        role,
        sub_role_id,
        is_active: true,
    })?;
    info!("✅ {} created: {}", role, username);
    Ok(user)
}

fn seed_form(store: &Store, owner: &User, definition: FormDefinition) -> eyre::Result<()> {
    let exists = store
        .list_forms(Some(&owner.id))?
        .iter()
        .any(|detail| detail.form.title == definition.title);
    if exists {
        warn!("⚠️ Form already exists: {}", definition.title);
        return Ok(());
    }

    let draft = definition.validate()?;
    store.insert_form(&owner.id, &draft)?;
    info!("✅ Form created: {}", draft.title);
    Ok(())
}

/// Checklist harian genset, khusus Teknisi Mesin
fn genset_checklist(mesin: &SubRole) -> eyre::Result<FormDefinition> {
    let definition = serde_json::from_value(json!({
        "title": "Checklist Harian Mesin Genset",
        "description": "Laporan pemeriksaan harian untuk unit Genset Utama",
        "sub_role_id": mesin.id,
        "questions": [
            {
                "type": "short_text",
                "label": "Nomor Unit Genset",
                "description": "Masukkan nomor identifikasi unit",
                "required": true,
                "order": 0
            },
            {
                "type": "multiple_choice",
                "label": "Kondisi Oli Mesin",
                "options": ["Normal", "Kotor/Perlu Ganti", "Volume Kurang", "Bocor"],
                "required": true,
                "order": 1
            },
            {
                "type": "rating",
                "label": "Kondisi Fisik Unit",
                "description": "Berikan penilaian kondisi fisik secara umum",
                "rating_max": 5,
                "required": true,
                "order": 2
            },
            {
                "type": "file_upload",
                "label": "Foto Unit",
                "description": "Upload foto kondisi terkini unit",
                "order": 3
            }
        ]
    }))?;
    Ok(definition)
}

/// Laporan insiden, untuk semua teknisi (tanpa target sub-role)
fn incident_report() -> eyre::Result<FormDefinition> {
    let definition = serde_json::from_value(json!({
        "title": "Laporan Insiden Lapangan",
        "description": "Form untuk melaporkan kejadian tidak terduga atau kerusakan mendadak",
        "questions": [
            { "type": "date", "label": "Tanggal Kejadian", "required": true, "order": 0 },
            { "type": "time", "label": "Waktu Kejadian", "required": true, "order": 1 },
            {
                "type": "dropdown",
                "label": "Lokasi",
                "options": ["Terminal 1", "Terminal 2", "Runway", "Hangar", "Parkir Area"],
                "required": true,
                "order": 2
            },
            {
                "type": "paragraph",
                "label": "Kronologi Kejadian",
                "description": "Jelaskan detail kejadian secara rinci",
                "required": true,
                "order": 3
            },
            {
                "type": "linear_scale",
                "label": "Tingkat Urgensi",
                "scale_min": 1,
                "scale_max": 5,
                "scale_min_label": "Rendah",
                "scale_max_label": "Kritis",
                "required": true,
                "order": 4
            }
        ]
    }))?;
    Ok(definition)
}
