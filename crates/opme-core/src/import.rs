//! CSV import for the finance ledger and bank statements
//!
//! Both formats are header-driven, accept `,` or `;` as delimiter and
//! Brazilian number/date conventions (`1.234,56`, `31/01/2026`).
//!
//! Accounts (contas a pagar/receber):
//! `descricao;tipo;status;valor;valor_final;data_vencimento;data_pagamento;categoria`
//! (`valor_final`, `data_pagamento` and `categoria` optional)
//!
//! Bank statements: `data;descricao;valor[;tipo][;categoria]` where `valor`
//! is signed unless a `tipo` column (credito/debito) gives the direction.

use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use tracing::{debug, info};

use crate::analytics::{AccountStatus, AccountType};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{NewBankTransaction, NewFinancialAccount, TransactionKind};

/// Outcome of importing one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub parsed: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

/// Column positions resolved from the header row
struct Columns {
    headers: Vec<String>,
}

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        Self {
            headers: headers.iter().map(normalize_header).collect(),
        }
    }

    fn find(&self, names: &[&str]) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| names.contains(&h.as_str()))
    }

    fn require(&self, names: &[&str]) -> Result<usize> {
        self.find(names)
            .ok_or_else(|| Error::Import(format!("Missing column: {}", names[0])))
    }
}

fn normalize_header(h: &str) -> String {
    h.trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' => 'u',
            'ç' => 'c',
            ' ' => '_',
            other => other,
        })
        .collect()
}

fn field<'a>(record: &'a StringRecord, idx: Option<usize>) -> Option<&'a str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn required_field<'a>(record: &'a StringRecord, idx: usize, line: usize) -> Result<&'a str> {
    field(record, Some(idx)).ok_or_else(|| {
        Error::Import(format!("Line {}: empty value in column {}", line, idx + 1))
    })
}

/// Read the whole input and pick the delimiter from the header line
fn reader_for<R: Read>(mut input: R) -> Result<csv::Reader<std::io::Cursor<String>>> {
    let mut content = String::new();
    input.read_to_string(&mut content)?;

    let header = content.lines().next().unwrap_or_default();
    let delimiter = if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    };

    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(std::io::Cursor::new(content)))
}

/// Parse a date in Brazilian or ISO format
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%d/%m/%Y", // 31/01/2026
        "%Y-%m-%d", // 2026-01-31
        "%d-%m-%Y", // 31-01-2026
        "%d/%m/%y", // 31/01/26
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount, accepting `R$`, Brazilian separators and accounting parentheses
pub fn parse_amount(s: &str) -> Result<f64> {
    let mut cleaned: String = s
        .trim()
        .replace("R$", "")
        .replace([' ', '\u{a0}'], "")
        .replace('(', "-")
        .replace(')', "");

    if cleaned.contains(',') {
        cleaned = cleaned.replace('.', "").replace(',', ".");
    }

    cleaned
        .parse::<f64>()
        .map_err(|_| Error::Import(format!("Unable to parse amount: {}", s)))
}

/// Parse a receivables/payables CSV
pub fn parse_accounts_csv<R: Read>(reader: R) -> Result<Vec<NewFinancialAccount>> {
    let mut rdr = reader_for(reader)?;
    let cols = Columns::new(rdr.headers()?);

    let description = cols.require(&["descricao", "description"])?;
    let kind = cols.require(&["tipo", "type"])?;
    let amount = cols.require(&["valor", "amount"])?;
    let due = cols.require(&["data_vencimento", "vencimento", "due_date"])?;
    let status = cols.find(&["status", "situacao"]);
    let final_amount = cols.find(&["valor_final", "final_amount"]);
    let paid = cols.find(&["data_pagamento", "pagamento", "payment_date"]);
    let category = cols.find(&["categoria", "category"]);

    let mut accounts = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let line = i + 2;

        let account_type: AccountType = required_field(&record, kind, line)?
            .parse()
            .map_err(|e| Error::Import(format!("Line {}: {}", line, e)))?;
        let payment_date = field(&record, paid).map(parse_date).transpose()?;
        let status = match field(&record, status) {
            Some(s) => s
                .parse::<AccountStatus>()
                .map_err(|e| Error::Import(format!("Line {}: {}", line, e)))?,
            None if payment_date.is_some() => AccountStatus::Paid,
            None => AccountStatus::Pending,
        };

        accounts.push(NewFinancialAccount {
            description: required_field(&record, description, line)?.to_string(),
            account_type,
            status,
            amount: parse_amount(required_field(&record, amount, line)?)?,
            final_amount: field(&record, final_amount).map(parse_amount).transpose()?,
            due_date: parse_date(required_field(&record, due, line)?)?,
            payment_date,
            category: field(&record, category).unwrap_or("geral").to_string(),
            client_id: None,
        });
    }

    debug!("Parsed {} financial accounts", accounts.len());
    Ok(accounts)
}

/// Parse a bank statement CSV
pub fn parse_statement_csv<R: Read>(
    reader: R,
    bank_account: Option<&str>,
) -> Result<Vec<NewBankTransaction>> {
    let mut rdr = reader_for(reader)?;
    let cols = Columns::new(rdr.headers()?);

    let date = cols.require(&["data", "date"])?;
    let description = cols.require(&["descricao", "historico", "description"])?;
    let amount = cols.require(&["valor", "amount"])?;
    let kind = cols.find(&["tipo", "type"]);
    let category = cols.find(&["categoria", "category"]);

    let mut transactions = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let line = i + 2;

        let value = parse_amount(required_field(&record, amount, line)?)?;
        let kind = match field(&record, kind) {
            Some(k) => k
                .parse::<TransactionKind>()
                .map_err(|e| Error::Import(format!("Line {}: {}", line, e)))?,
            None => TransactionKind::from_amount(value),
        };

        transactions.push(NewBankTransaction {
            date: parse_date(required_field(&record, date, line)?)?,
            description: required_field(&record, description, line)?.to_string(),
            amount: value.abs(),
            kind,
            category: field(&record, category).map(String::from),
            bank_account: bank_account.map(String::from),
        });
    }

    debug!("Parsed {} bank transactions", transactions.len());
    Ok(transactions)
}

/// Parse and store a receivables/payables CSV
pub fn import_accounts<R: Read>(db: &Database, reader: R) -> Result<ImportSummary> {
    let accounts = parse_accounts_csv(reader)?;
    for account in &accounts {
        db.insert_financial_account(account)?;
    }

    let summary = ImportSummary {
        parsed: accounts.len(),
        inserted: accounts.len(),
        duplicates: 0,
    };
    db.log_audit(
        "cli",
        "import_accounts",
        Some("conta_financeira"),
        None,
        Some(&format!("{} rows", summary.inserted)),
    )?;
    info!(inserted = summary.inserted, "Imported financial accounts");
    Ok(summary)
}

/// Parse and store a bank statement, skipping lines already imported
pub fn import_statement<R: Read>(
    db: &Database,
    reader: R,
    bank_account: Option<&str>,
) -> Result<ImportSummary> {
    let transactions = parse_statement_csv(reader, bank_account)?;

    let mut summary = ImportSummary {
        parsed: transactions.len(),
        ..Default::default()
    };
    for tx in &transactions {
        match db.insert_bank_transaction(tx)? {
            Some(_) => summary.inserted += 1,
            None => summary.duplicates += 1,
        }
    }

    db.log_audit(
        "cli",
        "import_statement",
        Some("transacao_bancaria"),
        None,
        Some(&format!(
            "{} inserted, {} duplicates",
            summary.inserted, summary.duplicates
        )),
    )?;
    info!(
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        "Imported bank statement"
    );
    Ok(summary)
}
