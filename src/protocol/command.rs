use std::fmt::{Debug, Formatter};

/// A single command sent to the store: a name followed by byte-string arguments.
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    parts: Vec<Vec<u8>>,
}

impl Command {
    pub fn new<N: AsRef<str>>(name: N) -> Self {
        Self { parts: vec![name.as_ref().as_bytes().to_vec()] }
    }

    /// Append one argument.
    pub fn arg<A: AsRef<[u8]>>(mut self, arg: A) -> Self {
        self.parts.push(arg.as_ref().to_vec());
        self
    }

    pub fn auth(password: &str) -> Self {
        Self::new("AUTH").arg(password)
    }

    pub fn select(db: u32) -> Self {
        Self::new("SELECT").arg(db.to_string())
    }

    pub fn get(key: &str) -> Self {
        Self::new("GET").arg(key)
    }

    pub fn setex(key: &str, ttl_secs: u64, value: &[u8]) -> Self {
        Self::new("SETEX").arg(key).arg(ttl_secs.to_string()).arg(value)
    }

    pub fn lpush(key: &str, value: &[u8]) -> Self {
        Self::new("LPUSH").arg(key).arg(value)
    }

    /// The command name, upper-cased.
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.parts[0]).to_ascii_uppercase()
    }

    /// Arguments after the name.
    pub fn args(&self) -> &[Vec<u8>] {
        &self.parts[1..]
    }

    /// Wire form of the command.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = format!("*{}\r\n", self.parts.len()).into_bytes();
        for part in &self.parts {
            buf.extend_from_slice(format!("${}\r\n", part.len()).as_bytes());
            buf.extend_from_slice(part);
            buf.extend_from_slice(b"\r\n");
        }
        buf
    }
}

impl Debug for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = self.name();
        let mut list = f.debug_list();
        list.entry(&name);
        // Never log the credential.
        if name == "AUTH" {
            list.entry(&"<redacted>");
        } else {
            for arg in self.args() {
                list.entry(&String::from_utf8_lossy(arg));
            }
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_as_array_of_bulk_strings() {
        let command = Command::lpush("default", b"{}");
        assert_eq!(command.encode(), b"*3\r\n$5\r\nLPUSH\r\n$7\r\ndefault\r\n$2\r\n{}\r\n".to_vec());
    }

    #[test]
    fn lengths_count_bytes_not_characters() {
        let command = Command::new("SET").arg("kľúč");
        assert_eq!(command.encode(), "*2\r\n$3\r\nSET\r\n$7\r\nkľúč\r\n".as_bytes().to_vec());
    }

    #[test]
    fn setex_carries_ttl_as_decimal() {
        let command = Command::setex("k", 86400, b"v");
        assert_eq!(command.name(), "SETEX");
        assert_eq!(command.args(), &[b"k".to_vec(), b"86400".to_vec(), b"v".to_vec()]);
    }

    #[test]
    fn debug_hides_password() {
        let command = Command::auth("hunter2");
        assert_eq!(format!("{command:?}"), r#"["AUTH", "<redacted>"]"#);
    }
}
