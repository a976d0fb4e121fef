// Prints an Argon2 PHC hash, or a ready-to-run app_user INSERT when a username is given.
//
//   hashpass <password> [username] [client|doctor|admin]

use anyhow::{anyhow, bail};
use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHasher};

fn role_code(role: &str) -> anyhow::Result<i16> {
    match role {
        "client" => Ok(0),
        "doctor" => Ok(1),
        "admin" => Ok(2),
        other => bail!("unknown role {other:?}, expected client, doctor or admin"),
    }
}

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let password = args
        .next()
        .ok_or_else(|| anyhow!("Usage: hashpass <password> [username] [client|doctor|admin]"))?;

    let salt = SaltString::generate(&mut OsRng);
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("argon2 hash error: {e}"))?
        .to_string();

    match args.next() {
        None => println!("{phc}"),
        Some(username) => {
            let role = role_code(args.next().as_deref().unwrap_or("client"))?;
            let username = username.replace('\'', "''");
            println!(
                "INSERT INTO app_user (username, display_name, password_hash, role) \
                 VALUES ('{username}', '{username}', '{phc}', {role});"
            );
        }
    }
    Ok(())
}
