//! Nexus - 智能体餐厅点餐
//!
//! 入口：初始化日志、加载配置、创建会话，并运行命令行对话循环。
//! 普通输入交给编排器；以 `/` 开头的是人工操作（后厨推进订单、上下架、查看日志等）。

use std::path::PathBuf;

use anyhow::Context;
use nexus::config::load_config;
use nexus::core::orchestrator::tool_error_of;
use nexus::core::TurnPhase;
use nexus::store::{format_money, OrderStatus};
use nexus::{create_session, observability, Session};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const HELP: &str = "\
Commands:
  /menu               list the menu
  /orders             list all orders (most recent first)
  /kitchen            kitchen board grouped by status
  /advance <id>       move an order one step forward
  /cancel <id>        cancel an order
  /status <id> <s>    set an order status (pending|preparing|ready|delivered|cancelled)
  /toggle <item-id>   toggle menu item availability
  /logs               recent agent activity
  /stats              sales summary
  /history            conversation history
  /quit               exit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    let session = create_session(&cfg);

    // 回合进行中提示
    let mut phase_rx = session.orchestrator.subscribe_phase();
    tokio::spawn(async move {
        while phase_rx.changed().await.is_ok() {
            if *phase_rx.borrow() == TurnPhase::AwaitingModel {
                println!("  ... Agents coordinating...");
            }
        }
    });

    for msg in session.orchestrator.history() {
        println!("NEXUS> {}", msg.content);
    }
    println!("(type /help for commands)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"YOU> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            if !run_command(&session, command) {
                break;
            }
            continue;
        }

        match session.chat(line).await {
            Ok(reply) => {
                if let Some(tool) = &reply.tool_called {
                    match reply.tool_result.as_ref().and_then(tool_error_of) {
                        Some(err) => println!("  [tool: {tool} failed: {err}]"),
                        None => println!("  [tool: {tool}]"),
                    }
                }
                println!("NEXUS> {}", reply.text);
            }
            Err(e) => println!("SYSTEM> {e}"),
        }
    }

    session.close();
    Ok(())
}

/// 执行人工命令；返回 false 表示退出
fn run_command(session: &Session, command: &str) -> bool {
    let store = &session.store;
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();
    let value = parts.next();

    match (name, arg) {
        ("quit" | "exit", _) => return false,
        ("help", _) => println!("{HELP}"),
        ("menu", _) => {
            for item in store.list_menu() {
                let stock = if item.available { "" } else { "  [out of stock]" };
                println!(
                    "  {:<4} {:<32} ${:>6}  {}{}",
                    item.id,
                    item.name,
                    format_money(item.price),
                    item.category,
                    stock
                );
            }
        }
        ("orders", _) => {
            for order in store.orders() {
                println!(
                    "  #{} {:<12} {:<10} ${}",
                    order.id,
                    order.customer_name,
                    order.status,
                    format_money(order.total)
                );
            }
        }
        ("kitchen", _) => {
            for status in [
                OrderStatus::Pending,
                OrderStatus::Preparing,
                OrderStatus::Ready,
            ] {
                println!("  == {status} ==");
                for order in store.orders_with_status(status) {
                    let items: Vec<String> = order
                        .items
                        .iter()
                        .map(|i| format!("{}x {}", i.quantity, i.name))
                        .collect();
                    println!("    #{} {}: {}", order.id, order.customer_name, items.join(", "));
                }
            }
        }
        ("advance", Some(id)) => match store.advance_order(id) {
            Ok(status) => println!("  #{id} -> {status}"),
            Err(e) => println!("  {e}"),
        },
        ("cancel", Some(id)) => match store.cancel_order(id) {
            Ok(()) => println!("  #{id} cancelled"),
            Err(e) => println!("  {e}"),
        },
        ("status", Some(id)) => match value.and_then(OrderStatus::parse) {
            Some(status) => match store.update_order_status(id, status) {
                Ok(()) => println!("  #{id} -> {status}"),
                Err(e) => println!("  {e}"),
            },
            None => println!("  usage: /status <id> pending|preparing|ready|delivered|cancelled"),
        },
        ("toggle", Some(id)) => match store.toggle_availability(id) {
            Ok(available) => println!("  {id} available = {available}"),
            Err(e) => println!("  {e}"),
        },
        ("logs", _) => {
            for log in store.logs().iter().take(15) {
                println!(
                    "  {} [{}] {} / {}: {}",
                    log.timestamp.format("%H:%M:%S"),
                    log.status,
                    log.agent_name,
                    log.action,
                    log.details
                );
            }
        }
        ("stats", _) => {
            let s = store.sales_summary();
            println!(
                "  revenue ${}  orders {}  avg ${}",
                format_money(s.total_revenue),
                s.order_count,
                format_money(s.average_order_value)
            );
            for p in s.popular_items {
                println!("    {:<32} {}", p.name, p.quantity);
            }
        }
        ("history", _) => {
            for msg in session.orchestrator.history() {
                println!("  {:?}: {}", msg.role, msg.content);
            }
        }
        (_, None) if matches!(name, "advance" | "cancel" | "toggle" | "status") => {
            println!("  usage: /{name} <id>")
        }
        _ => println!("  unknown command, try /help"),
    }
    true
}
