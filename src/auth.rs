use anyhow::{Result, bail};
use deadbolt::{MIN_PASSWORD_LEN, check_password};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

/// Resolves the password for an operation.
///
/// Sources, in order: `--password` / `DEADBOLT_PASSWORD`, one line of piped
/// stdin, an interactive prompt. Returns `Ok(None)` when the user cancels
/// the prompt with an empty answer.
pub fn read_password(provided: Option<String>, confirm: bool) -> Result<Option<Zeroizing<String>>> {
    //  Flag or environment variable
    //  DEADBOLT_PASSWORD="supersecret" deadbolt decrypt notes.txt.deadbolt
    if let Some(pw) = provided.filter(|pw| !pw.is_empty()) {
        let pw = Zeroizing::new(pw);
        check_password(&pw)?;
        return Ok(Some(pw));
    }

    //  stdin (Pipeline)
    //  printf "%s" "$SECRET" | deadbolt encrypt notes.txt
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut buf)?;
        trim_newline(&mut buf);

        if buf.is_empty() {
            bail!("No password provided");
        }
        check_password(&buf)?;
        return Ok(Some(buf));
    }

    prompt_password(confirm)
}

/// Interactive prompt. Re-asks on short passwords and confirmation
/// mismatches.
fn prompt_password(confirm: bool) -> Result<Option<Zeroizing<String>>> {
    let password = loop {
        let pw = Zeroizing::new(rpassword::prompt_password("Enter password:  ")?);
        if pw.is_empty() {
            return Ok(None);
        }
        if check_password(&pw).is_err() {
            eprintln!("Password must be at least {MIN_PASSWORD_LEN} characters\n");
            continue;
        }
        break pw;
    };

    if confirm {
        loop {
            let again = Zeroizing::new(rpassword::prompt_password("Confirm password:")?);
            if again.is_empty() {
                return Ok(None);
            }
            if *again != *password {
                eprintln!("Passwords do not match\n");
                continue;
            }
            break;
        }
    }

    Ok(Some(password))
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
