use super::graph::{AigLit, AndGate, Aig, Latch};
use crate::error::{Error, Result};
use std::io::{BufRead, Read, Write};

/// Reads either textual (`aag`) or binary (`aig`) AIGER from `r`, detected
/// from the header's magic word (§6: "binary or ASCII AIGER").
pub fn read(mut r: impl Read) -> Result<Aig> {
    let mut header_buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        r.read_exact(&mut byte)
            .map_err(|e| Error::input(format!("truncated AIGER header: {e}")))?;
        header_buf.push(byte[0]);
        if byte[0] == b'\n' {
            break;
        }
    }
    let header_line = String::from_utf8_lossy(&header_buf).into_owned();
    let header = parse_header(&header_line)?;
    match header.magic.as_str() {
        "aag" => read_ascii_body(r, header),
        "aig" => read_binary_body(r, header),
        other => Err(Error::input(format!("unknown AIGER magic {other:?}"))),
    }
}

struct Header {
    magic: String,
    max_var: u32,
    inputs: usize,
    latches: usize,
    outputs: usize,
    ands: usize,
}

fn parse_header(line: &str) -> Result<Header> {
    let fields = line.split_whitespace().collect::<Vec<_>>();
    if fields.len() < 6 {
        return Err(Error::input(format!("malformed AIGER header {line:?}")));
    }
    let num = |s: &str| {
        s.parse::<u32>()
            .map_err(|_| Error::input(format!("non-numeric AIGER header field {s:?}")))
    };
    Ok(Header {
        magic: fields[0].to_string(),
        max_var: num(fields[1])?,
        inputs: num(fields[2])? as usize,
        latches: num(fields[3])? as usize,
        outputs: num(fields[4])? as usize,
        ands: num(fields[5])? as usize,
    })
}

fn read_ascii_body(r: impl Read, header: Header) -> Result<Aig> {
    let mut lines = std::io::BufReader::new(r).lines();
    let mut next = || -> Result<String> {
        lines
            .next()
            .ok_or_else(|| Error::input("truncated AIGER body"))?
            .map_err(|e| Error::input(format!("AIGER read error: {e}")))
    };

    let mut aig = Aig {
        max_var: header.max_var,
        ..Aig::new()
    };

    for _ in 0..header.inputs {
        let line = next()?;
        let lit = parse_u32(&line)?;
        aig.inputs.push(lit);
    }
    for _ in 0..header.latches {
        let line = next()?;
        let fields = line.split_whitespace().collect::<Vec<_>>();
        if fields.len() < 2 {
            return Err(Error::input(format!("malformed latch line {line:?}")));
        }
        let out = parse_u32(fields[0])?;
        let next_lit = parse_u32(fields[1])?;
        if fields.len() >= 3 {
            let reset = parse_u32(fields[2])?;
            if reset != 0 {
                return Err(Error::input(
                    "non-zero latch reset values are not supported (§6)",
                ));
            }
        }
        aig.latches.push(Latch { out, next: next_lit });
    }
    for _ in 0..header.outputs {
        let line = next()?;
        aig.outputs.push(parse_u32(&line)?);
    }
    for _ in 0..header.ands {
        let line = next()?;
        let fields = line.split_whitespace().collect::<Vec<_>>();
        if fields.len() != 3 {
            return Err(Error::input(format!("malformed AND line {line:?}")));
        }
        aig.ands.push(AndGate {
            out: parse_u32(fields[0])?,
            a: parse_u32(fields[1])?,
            b: parse_u32(fields[2])?,
        });
    }

    read_symbol_table(&mut lines, &mut aig)?;
    Ok(aig)
}

fn read_binary_body(mut r: impl Read, header: Header) -> Result<Aig> {
    let mut aig = Aig {
        max_var: header.max_var,
        ..Aig::new()
    };

    // inputs are implicit: literals 2, 4, .., 2*inputs
    for k in 0..header.inputs {
        aig.inputs.push(((k + 1) as u32) * 2);
    }

    // latch next-literals are given one per ASCII line; outputs are given
    // as implicit positive literals 2*(inputs+k+1). A single buffered reader
    // is kept alive across the line-based section and the binary section
    // below: dropping a `BufReader` mid-stream would discard whatever it
    // had already pulled into its buffer past the last line it returned.
    let mut reader = std::io::BufReader::new(r);
    let mut text_lines = Vec::new();
    for _ in 0..(header.latches + header.outputs) {
        let mut line = String::new();
        let n = reader
            .read_line(&mut line)
            .map_err(|e| Error::input(format!("AIGER read error: {e}")))?;
        if n == 0 {
            return Err(Error::input("truncated AIGER body"));
        }
        text_lines.push(line.trim_end().to_string());
    }
    let mut text_lines = text_lines.into_iter();
    for k in 0..header.latches {
        let out = (header.inputs + k + 1) as u32 * 2;
        let line = text_lines
            .next()
            .ok_or_else(|| Error::input("truncated AIGER latch section"))?;
        let fields = line.split_whitespace().collect::<Vec<_>>();
        let next_lit = parse_u32(fields.first().copied().unwrap_or(""))?;
        if let Some(reset) = fields.get(1) {
            if parse_u32(reset)? != 0 {
                return Err(Error::input(
                    "non-zero latch reset values are not supported (§6)",
                ));
            }
        }
        aig.latches.push(Latch { out, next: next_lit });
    }
    for _ in 0..header.outputs {
        let line = text_lines
            .next()
            .ok_or_else(|| Error::input("truncated AIGER output section"))?;
        aig.outputs.push(parse_u32(&line)?);
    }

    // binary-encoded AND gates: two LEB128 deltas per gate, gate literals
    // implicit and sequential.
    for k in 0..header.ands {
        let out = (header.inputs + header.latches + k + 1) as u32 * 2;
        let d0 = read_varint(&mut reader)?;
        let d1 = read_varint(&mut reader)?;
        let rhs0 = out
            .checked_sub(d0)
            .ok_or_else(|| Error::input("AND gate delta underflow"))?;
        let rhs1 = rhs0
            .checked_sub(d1)
            .ok_or_else(|| Error::input("AND gate delta underflow"))?;
        aig.ands.push(AndGate { out, a: rhs0, b: rhs1 });
    }

    let mut lines = reader.lines();
    read_symbol_table(&mut lines, &mut aig)?;
    Ok(aig)
}

fn read_symbol_table(
    lines: &mut std::io::Lines<impl BufRead>,
    aig: &mut Aig,
) -> Result<()> {
    for line in lines {
        let line = line.map_err(|e| Error::input(format!("AIGER read error: {e}")))?;
        if line.starts_with('c') {
            break; // comment section, read to EOF
        }
        let mut parts = line.splitn(2, ' ');
        let tag = parts.next().unwrap_or("");
        let name = parts.next().unwrap_or("").to_string();
        if let Some(rest) = tag.strip_prefix('i') {
            let idx: usize = rest
                .parse()
                .map_err(|_| Error::input(format!("malformed symbol tag {tag:?}")))?;
            if let Some(&lit) = aig.inputs.get(idx) {
                aig.input_names.insert(lit, name);
            }
        } else if let Some(rest) = tag.strip_prefix('l') {
            let idx: usize = rest
                .parse()
                .map_err(|_| Error::input(format!("malformed symbol tag {tag:?}")))?;
            if let Some(latch) = aig.latches.get(idx) {
                aig.latch_names.insert(latch.out, name);
            }
        } else if let Some(rest) = tag.strip_prefix('o') {
            let idx: usize = rest
                .parse()
                .map_err(|_| Error::input(format!("malformed symbol tag {tag:?}")))?;
            if let Some(&lit) = aig.outputs.get(idx) {
                aig.output_names.insert(lit, name);
            }
        }
        // unrecognized tags (e.g. 'b'/'j'/'f', Non-goal liveness/fairness) are ignored
    }
    Ok(())
}

fn parse_u32(s: &str) -> Result<u32> {
    s.trim()
        .parse::<u32>()
        .map_err(|_| Error::input(format!("expected AIGER literal, got {s:?}")))
}

fn read_varint(r: &mut impl Read) -> Result<u32> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    loop {
        let mut byte = [0u8; 1];
        r.read_exact(&mut byte)
            .map_err(|e| Error::input(format!("truncated AIGER binary section: {e}")))?;
        result |= ((byte[0] & 0x7f) as u64) << shift;
        if byte[0] & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    u32::try_from(result).map_err(|_| Error::input("AIGER varint overflow"))
}

fn write_varint(w: &mut impl Write, mut value: u32) -> Result<()> {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            w.write_all(&[byte | 0x80])
                .map_err(|e| Error::resource(format!("AIGER write error: {e}")))?;
        } else {
            w.write_all(&[byte])
                .map_err(|e| Error::resource(format!("AIGER write error: {e}")))?;
            break;
        }
    }
    Ok(())
}

/// Writes ASCII AIGER (`aag`), used for `aig_out = "stdout"` (§6) and as
/// the default in tests because it is trivially diffable.
pub fn write_ascii(aig: &Aig, mut w: impl Write) -> Result<()> {
    let io_err = |e: std::io::Error| Error::resource(format!("AIGER write error: {e}"));
    writeln!(
        w,
        "aag {} {} {} {} {}",
        aig.max_var,
        aig.inputs.len(),
        aig.latches.len(),
        aig.outputs.len(),
        aig.ands.len()
    )
    .map_err(io_err)?;
    for lit in &aig.inputs {
        writeln!(w, "{lit}").map_err(io_err)?;
    }
    for latch in &aig.latches {
        writeln!(w, "{} {} 0", latch.out, latch.next).map_err(io_err)?;
    }
    for out in &aig.outputs {
        writeln!(w, "{out}").map_err(io_err)?;
    }
    for gate in &aig.ands {
        writeln!(w, "{} {} {}", gate.out, gate.a, gate.b).map_err(io_err)?;
    }
    write_symbol_table(aig, &mut w)?;
    Ok(())
}

/// Writes binary AIGER (`aig`): delta-encoded AND gates, matching the
/// canonical AIGER 1.9 binary format.
pub fn write_binary(aig: &Aig, mut w: impl Write) -> Result<()> {
    let io_err = |e: std::io::Error| Error::resource(format!("AIGER write error: {e}"));
    writeln!(
        w,
        "aig {} {} {} {} {}",
        aig.max_var,
        aig.inputs.len(),
        aig.latches.len(),
        aig.outputs.len(),
        aig.ands.len()
    )
    .map_err(io_err)?;
    for latch in &aig.latches {
        writeln!(w, "{}", latch.next).map_err(io_err)?;
    }
    for out in &aig.outputs {
        writeln!(w, "{out}").map_err(io_err)?;
    }
    for gate in &aig.ands {
        let (rhs0, rhs1) = if gate.a >= gate.b {
            (gate.a, gate.b)
        } else {
            (gate.b, gate.a)
        };
        let d0 = gate
            .out
            .checked_sub(rhs0)
            .ok_or_else(|| Error::logic("AND gate literal precedes its operand"))?;
        let d1 = rhs0
            .checked_sub(rhs1)
            .ok_or_else(|| Error::logic("AND gate operands out of order"))?;
        write_varint(&mut w, d0)?;
        write_varint(&mut w, d1)?;
    }
    write_symbol_table(aig, &mut w)?;
    Ok(())
}

fn write_symbol_table(aig: &Aig, w: &mut impl Write) -> Result<()> {
    let io_err = |e: std::io::Error| Error::resource(format!("AIGER write error: {e}"));
    for (idx, lit) in aig.inputs.iter().enumerate() {
        if let Some(name) = aig.input_names.get(lit) {
            writeln!(w, "i{idx} {name}").map_err(io_err)?;
        }
    }
    for (idx, latch) in aig.latches.iter().enumerate() {
        if let Some(name) = aig.latch_names.get(&latch.out) {
            writeln!(w, "l{idx} {name}").map_err(io_err)?;
        }
    }
    for (idx, lit) in aig.outputs.iter().enumerate() {
        if let Some(name) = aig.output_names.get(lit) {
            writeln!(w, "o{idx} {name}").map_err(io_err)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_latch_aig() -> Aig {
        // one latch `s`, no inputs, error = s, s' = 0
        let mut aig = Aig {
            max_var: 1,
            ..Aig::new()
        };
        aig.latches.push(Latch { out: 2, next: 0 });
        aig.outputs.push(2);
        aig.latch_names.insert(2, "s".to_string());
        aig
    }

    #[test]
    fn ascii_round_trips() {
        let aig = single_latch_aig();
        let mut buf = Vec::new();
        write_ascii(&aig, &mut buf).unwrap();
        let parsed = read(&buf[..]).unwrap();
        assert_eq!(parsed.latches.len(), 1);
        assert_eq!(parsed.outputs, vec![2]);
        assert_eq!(parsed.latch_names.get(&2).map(String::as_str), Some("s"));
    }

    #[test]
    fn binary_round_trips_with_and_gates() {
        let mut aig = Aig {
            max_var: 2,
            ..Aig::new()
        };
        aig.inputs.push(2);
        let g = aig.push_and(2, 5); // a ∧ ¬input
        aig.outputs.push(g);

        let mut buf = Vec::new();
        write_binary(&aig, &mut buf).unwrap();
        let parsed = read(&buf[..]).unwrap();
        assert_eq!(parsed.ands.len(), 1);
        assert_eq!(parsed.ands[0].a, 2);
        assert_eq!(parsed.ands[0].b, 5);
        assert_eq!(parsed.outputs, vec![g]);
    }

    #[test]
    fn nonzero_reset_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"aag 1 0 1 1 0\n2 1 1\n2\n");
        let err = read(&buf[..]).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn controllable_prefix_is_case_insensitive() {
        assert!(Aig::is_controllable_name("Controllable_c0"));
        assert!(Aig::is_controllable_name("controllable_0"));
        assert!(!Aig::is_controllable_name("uncontrollable_i"));
    }
}
